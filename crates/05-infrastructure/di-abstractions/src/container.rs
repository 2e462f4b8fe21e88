//! 依赖注入容器抽象接口
//!
//! 提供依赖注入容器的核心抽象

use crate::definition::ComponentDefinition;
use crate::factory::AnyInstance;
use async_trait::async_trait;
use infrastructure_common::{
    ComponentDescriptor, ConfigError, DependencyError, LifecycleError, Scope,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 环境变量前缀
pub const CONFIG_ENV_PREFIX: &str = "BEAN_CONTAINER";

/// 依赖注入容器 trait
///
/// 提供完整的依赖注入功能
#[async_trait]
pub trait DiContainer: Send + Sync {
    /// 作用域句柄类型
    type ScopeHandle;

    /// 注册组件定义
    async fn register(&self, definition: ComponentDefinition) -> Result<(), DependencyError>;

    /// 解析组件
    async fn resolve(&self, name: &str) -> Result<AnyInstance, DependencyError>;

    /// 在指定作用域内解析组件
    async fn resolve_in_scope(&self, name: &str, scope: &Scope)
        -> Result<AnyInstance, DependencyError>;

    /// 预实例化所有非延迟单例，返回本次新创建的数量
    async fn refresh(&self) -> Result<usize, DependencyError>;

    /// 打开新作用域
    fn open_scope(&self, name: &str) -> Result<Self::ScopeHandle, DependencyError>;

    /// 关闭作用域，按创建逆序销毁其中的组件
    fn close_scope(&self, scope: &Scope) -> Result<(), LifecycleError>;

    /// 关闭容器
    fn close(&self) -> Result<(), LifecycleError>;

    /// 检查是否已注册组件（名称或限定符）
    async fn is_registered(&self, name: &str) -> bool;

    /// 获取所有已注册的组件描述（按注册顺序）
    async fn registered_components(&self) -> Vec<ComponentDescriptor>;

    /// 验证依赖关系，不创建任何实例
    async fn validate(&self) -> Result<(), Vec<DependencyError>>;

    /// 获取容器统计信息
    fn stats(&self) -> ContainerStats;
}

/// 销毁顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyOrder {
    /// 按实例创建的逆序（依赖方先于被依赖方销毁）
    ReverseCreation,
    /// 按组件注册的逆序
    ReverseRegistration,
}

impl Default for DestroyOrder {
    fn default() -> Self {
        Self::ReverseCreation
    }
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否在首次创建前检测循环依赖
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 单例销毁顺序
    pub destroy_order: DestroyOrder,
    /// 构建容器后是否立即创建所有非延迟单例
    pub eager_singletons: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
            destroy_order: DestroyOrder::ReverseCreation,
            eager_singletons: false,
        }
    }
}

impl ContainerConfig {
    /// 从配置文件（可选）和 `BEAN_CONTAINER_*` 环境变量加载配置
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_environment(
            path,
            config::Environment::with_prefix(CONFIG_ENV_PREFIX).try_parsing(true),
        )
    }

    /// 使用指定的环境变量源加载配置
    pub fn load_with_environment(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(environment);

        let loaded: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_resolution_depth 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 已注册组件数量
    pub registered_components: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
    /// 打开的作用域数量
    pub open_scopes: usize,
    /// 累计创建的实例数量（含原型）
    pub constructed_instances: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
}
