//! 作用域管理
//!
//! 作用域是一段有界的上下文（例如一次请求）。作用域组件在每个作用域内最多创建一次，
//! 作用域关闭时按创建逆序销毁。

use crate::cache::InstanceCache;
use crate::container::DiContainerImpl;
use di_abstractions::{downcast_instance, AnyInstance, DiContainer};
use infrastructure_common::{DependencyError, LifecycleError, Scope};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

tokio::task_local! {
    static ACTIVE_SCOPE: Arc<ScopeState>;
}

/// 当前任务的活动作用域
pub(crate) fn active_scope() -> Option<Arc<ScopeState>> {
    ACTIVE_SCOPE.try_with(Arc::clone).ok()
}

/// 打开中的作用域及其实例缓存
pub(crate) struct ScopeState {
    scope: Scope,
    sequence: u64,
    cache: InstanceCache,
}

impl ScopeState {
    pub(crate) fn new(scope: Scope, sequence: u64) -> Self {
        let cache = InstanceCache::new(scope.to_string());
        Self {
            scope,
            sequence,
            cache,
        }
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    /// 打开顺序
    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn cache(&self) -> &InstanceCache {
        &self.cache
    }
}

/// 作用域句柄
///
/// 由 [`DiContainer::open_scope`] 返回。显式调用 [`ScopeGuard::close`] 可以拿到销毁失败信息；
/// 句柄被丢弃时如果作用域仍然打开，会自动关闭并记录失败日志。
pub struct ScopeGuard {
    container: DiContainerImpl,
    state: Arc<ScopeState>,
    released: bool,
}

impl ScopeGuard {
    pub(crate) fn new(container: DiContainerImpl, state: Arc<ScopeState>) -> Self {
        Self {
            container,
            state,
            released: false,
        }
    }

    /// 作用域标识
    pub fn scope(&self) -> &Scope {
        self.state.scope()
    }

    /// 在此作用域内解析组件
    pub async fn resolve(&self, name: &str) -> Result<AnyInstance, DependencyError> {
        self.container
            .resolve_with_scope(name, Some(self.state.clone()))
            .await
    }

    /// 在此作用域内解析并转换为具体类型
    pub async fn resolve_typed<T>(&self, name: &str) -> Result<Arc<T>, DependencyError>
    where
        T: Any + Send + Sync,
    {
        downcast_instance(name, self.resolve(name).await?)
    }

    /// 以此作用域作为活动作用域运行 future
    ///
    /// future 内通过 [`DiContainer::resolve`] 或 provider 解析的作用域组件都落在此作用域
    pub async fn run<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        ACTIVE_SCOPE.scope(self.state.clone(), future).await
    }

    /// 关闭作用域
    pub fn close(mut self) -> Result<(), LifecycleError> {
        self.released = true;
        self.container.close_scope(self.state.scope())
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("scope", self.state.scope())
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.container.close_scope(self.state.scope()) {
            Ok(())
            | Err(LifecycleError::ScopeNotFound { .. } | LifecycleError::ContainerClosed) => {}
            Err(e) => warn!("自动关闭作用域 {} 失败: {}", self.state.scope(), e),
        }
    }
}
