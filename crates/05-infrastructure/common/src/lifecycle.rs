//! 组件生命周期管理

use crate::errors::BoxError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件生命周期类型
///
/// 决定同一组件定义同时可以存活多少个实例，以及由谁负责销毁
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// 单例模式 - 整个容器生命周期内只创建一个实例
    Singleton,
    /// 原型模式 - 每次请求都创建新实例，容器不缓存也不销毁
    Prototype,
    /// 作用域模式 - 在同一作用域内共享实例，作用域关闭时销毁
    Scoped,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Singleton
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Singleton => "singleton",
            Self::Prototype => "prototype",
            Self::Scoped => "scoped",
        };
        f.write_str(name)
    }
}

/// 组件作用域
///
/// 由调用方打开和关闭的边界（例如一次请求），作用域组件在其中缓存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Scope {
    /// 创建新作用域
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

/// 组件实例生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// 初始化回调已执行
    Initialized,
    /// 销毁回调已执行
    Destroyed,
}

/// 组件生命周期回调 trait
///
/// 实现此 trait 的组件可以通过 `with_lifecycle` 注册回调，
/// 不需要单独声明初始化和销毁方法
pub trait Lifecycle: Send + Sync {
    /// 依赖注入完成后调用
    fn on_start(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// 所属作用域或容器关闭前调用
    fn on_stop(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
