//! 组件解析器抽象接口
//!
//! 提供按名称解析组件的能力，以及使用时才解析的 provider 访问器

use crate::factory::{downcast_instance, AnyInstance};
use async_trait::async_trait;
use infrastructure_common::{DependencyError, Scope};
use std::any::Any;
use std::sync::{Arc, Weak};

/// 组件解析器 trait
///
/// 负责解析组件依赖并创建组件实例
#[async_trait]
pub trait ComponentResolver: Send + Sync {
    /// 解析指定名称的组件（作用域组件使用当前任务的活动作用域）
    async fn resolve_by_name(&self, name: &str) -> Result<AnyInstance, DependencyError>;

    /// 在指定作用域内解析组件
    async fn resolve_in_scope(
        &self,
        name: &str,
        scope: &Scope,
    ) -> Result<AnyInstance, DependencyError>;
}

/// 组件访问器
///
/// 长生命周期组件持有它，而不是直接持有短生命周期的实例；
/// 每次调用 [`ComponentProvider::get`] 都会回到容器重新解析。
/// 只持有容器的弱引用，容器释放后返回 [`DependencyError::ContainerClosed`]。
#[derive(Clone)]
pub struct ComponentProvider {
    name: String,
    resolver: Weak<dyn ComponentResolver>,
}

impl ComponentProvider {
    /// 创建新的访问器
    pub fn new(name: impl Into<String>, resolver: Weak<dyn ComponentResolver>) -> Self {
        Self {
            name: name.into(),
            resolver,
        }
    }

    /// 目标组件名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 解析目标组件
    pub async fn get<T>(&self) -> Result<Arc<T>, DependencyError>
    where
        T: Any + Send + Sync,
    {
        let instance = self.resolver()?.resolve_by_name(&self.name).await?;
        downcast_instance(&self.name, instance)
    }

    /// 在指定作用域内解析目标组件
    pub async fn get_in<T>(&self, scope: &Scope) -> Result<Arc<T>, DependencyError>
    where
        T: Any + Send + Sync,
    {
        let instance = self.resolver()?.resolve_in_scope(&self.name, scope).await?;
        downcast_instance(&self.name, instance)
    }

    fn resolver(&self) -> Result<Arc<dyn ComponentResolver>, DependencyError> {
        self.resolver.upgrade().ok_or(DependencyError::ContainerClosed)
    }
}

impl std::fmt::Debug for ComponentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentProvider")
            .field("name", &self.name)
            .field("live", &(self.resolver.strong_count() > 0))
            .finish()
    }
}

/// 解析上下文
///
/// 每一层递归解析都持有自己的副本
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    pub resolution_chain: Vec<String>,
    /// 解析链上最近的单例组件，作用域组件不能被它直接持有
    pub singleton_owner: Option<String>,
    /// 最大递归深度
    pub max_depth: usize,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(max_depth: usize) -> Self {
        Self {
            resolution_chain: Vec::new(),
            singleton_owner: None,
            max_depth,
        }
    }

    /// 添加组件到解析链
    pub fn push(&mut self, name: &str) -> Result<(), DependencyError> {
        if self.resolution_chain.iter().any(|entry| entry == name) {
            return Err(DependencyError::CircularDependency {
                dependency_chain: self.chain_with(name),
            });
        }
        if self.resolution_chain.len() >= self.max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                max_depth: self.max_depth,
                dependency_chain: self.chain_with(name),
            });
        }
        self.resolution_chain.push(name.to_string());
        Ok(())
    }

    /// 解析链的文字表示
    pub fn chain_with(&self, name: &str) -> String {
        let mut chain = self.resolution_chain.clone();
        chain.push(name.to_string());
        chain.join(" -> ")
    }

    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new(100)
    }
}
