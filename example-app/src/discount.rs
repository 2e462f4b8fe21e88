//! 折扣策略

use crate::member::{Grade, Member};

/// 折扣策略
pub trait DiscountPolicy: Send + Sync {
    /// 返回折扣金额
    fn discount(&self, member: &Member, price: u64) -> u64;

    fn name(&self) -> &'static str;
}

/// 容器中保存的折扣策略
pub type DynDiscountPolicy = Box<dyn DiscountPolicy>;

/// 固定金额折扣：VIP 减 1000
#[derive(Debug, Clone)]
pub struct FixDiscountPolicy {
    amount: u64,
}

impl Default for FixDiscountPolicy {
    fn default() -> Self {
        Self { amount: 1000 }
    }
}

impl DiscountPolicy for FixDiscountPolicy {
    fn discount(&self, member: &Member, price: u64) -> u64 {
        match member.grade {
            Grade::Vip => self.amount.min(price),
            Grade::Basic => 0,
        }
    }

    fn name(&self) -> &'static str {
        "fix"
    }
}

/// 比例折扣：VIP 打 9 折
#[derive(Debug, Clone)]
pub struct RateDiscountPolicy {
    percent: u64,
}

impl Default for RateDiscountPolicy {
    fn default() -> Self {
        Self { percent: 10 }
    }
}

impl DiscountPolicy for RateDiscountPolicy {
    fn discount(&self, member: &Member, price: u64) -> u64 {
        match member.grade {
            Grade::Vip => price * self.percent / 100,
            Grade::Basic => 0,
        }
    }

    fn name(&self) -> &'static str {
        "rate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vip_discounts() {
        let vip = Member::new(1, "memberVIP", Grade::Vip);
        assert_eq!(FixDiscountPolicy::default().discount(&vip, 10_000), 1000);
        assert_eq!(RateDiscountPolicy::default().discount(&vip, 20_000), 2000);
    }

    #[test]
    fn basic_members_pay_full_price() {
        let basic = Member::new(2, "memberBASIC", Grade::Basic);
        assert_eq!(FixDiscountPolicy::default().discount(&basic, 10_000), 0);
        assert_eq!(RateDiscountPolicy::default().discount(&basic, 10_000), 0);
    }
}
