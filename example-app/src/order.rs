//! 订单领域

use crate::discount::DynDiscountPolicy;
use crate::member::DynMemberRepository;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// 订单错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OrderError {
    #[error("会员不存在: {member_id}")]
    MemberNotFound { member_id: u64 },
}

/// 订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub member_id: u64,
    pub item_name: String,
    pub item_price: u64,
    pub discount_price: u64,
}

impl Order {
    /// 实际支付金额
    pub fn calculate_price(&self) -> u64 {
        self.item_price - self.discount_price
    }
}

/// 订单服务
pub struct OrderService {
    member_repository: Arc<DynMemberRepository>,
    discount_policy: Arc<DynDiscountPolicy>,
}

impl OrderService {
    pub fn new(
        member_repository: Arc<DynMemberRepository>,
        discount_policy: Arc<DynDiscountPolicy>,
    ) -> Self {
        Self {
            member_repository,
            discount_policy,
        }
    }

    /// 创建订单
    pub fn create_order(
        &self,
        member_id: u64,
        item_name: impl Into<String>,
        item_price: u64,
    ) -> Result<Order, OrderError> {
        let member = self
            .member_repository
            .find_by_id(member_id)
            .ok_or(OrderError::MemberNotFound { member_id })?;
        let discount_price = self.discount_policy.discount(&member, item_price);

        let order = Order {
            member_id,
            item_name: item_name.into(),
            item_price,
            discount_price,
        };
        info!(
            "创建订单: 会员 {} 商品 {} 折扣 {} ({})",
            member_id,
            order.item_name,
            discount_price,
            self.discount_policy.name()
        );
        Ok(order)
    }

    pub fn member_repository(&self) -> &Arc<DynMemberRepository> {
        &self.member_repository
    }

    pub fn discount_policy_name(&self) -> &'static str {
        self.discount_policy.name()
    }
}
