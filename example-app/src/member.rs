//! 会员领域

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 会员等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    Basic,
    Vip,
}

/// 会员
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: u64,
    pub name: String,
    pub grade: Grade,
}

impl Member {
    pub fn new(id: u64, name: impl Into<String>, grade: Grade) -> Self {
        Self {
            id,
            name: name.into(),
            grade,
        }
    }
}

/// 会员存储
pub trait MemberRepository: Send + Sync {
    fn save(&self, member: Member);

    fn find_by_id(&self, id: u64) -> Option<Member>;
}

/// 容器中保存的会员存储
pub type DynMemberRepository = Box<dyn MemberRepository>;

/// 内存会员存储
#[derive(Debug, Default)]
pub struct MemoryMemberRepository {
    store: RwLock<HashMap<u64, Member>>,
}

impl MemberRepository for MemoryMemberRepository {
    fn save(&self, member: Member) {
        debug!("保存会员: {} ({:?})", member.name, member.grade);
        self.store.write().insert(member.id, member);
    }

    fn find_by_id(&self, id: u64) -> Option<Member> {
        self.store.read().get(&id).cloned()
    }
}

/// 会员服务
pub struct MemberService {
    repository: Arc<DynMemberRepository>,
}

impl MemberService {
    pub fn new(repository: Arc<DynMemberRepository>) -> Self {
        Self { repository }
    }

    /// 加入会员
    pub fn join(&self, member: Member) {
        self.repository.save(member);
    }

    pub fn find_member(&self, id: u64) -> Option<Member> {
        self.repository.find_by_id(id)
    }

    /// 使用的会员存储（用于验证共享的单例）
    pub fn repository(&self) -> &Arc<DynMemberRepository> {
        &self.repository
    }
}
