//! 错误类型定义

use std::fmt;
use thiserror::Error;

/// 组件工厂、生命周期回调返回的通用错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("组件重复注册: {name}")]
    DuplicateDefinition { name: String },

    #[error("组件未注册: {name}")]
    ComponentNotRegistered { name: String },

    #[error("组件创建失败: {name}, 原因: {source}")]
    ComponentCreationFailed { name: String, source: BoxError },

    #[error("组件初始化失败: {name}.{hook}, 原因: {source}")]
    InitHookFailed {
        name: String,
        hook: String,
        source: BoxError,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("没有活动的作用域, 无法解析作用域组件: {name}")]
    NoActiveScope { name: String },

    #[error("作用域不匹配: {consumer} ({consumer_lifetime}) 不能直接依赖 {dependency} ({dependency_lifetime}), 请改用 provider 依赖")]
    ScopeMismatch {
        consumer: String,
        consumer_lifetime: String,
        dependency: String,
        dependency_lifetime: String,
    },

    #[error("存在多个候选组件: {name} -> [{}]", .candidates.join(", "))]
    NoUniqueComponent {
        name: String,
        candidates: Vec<String>,
    },

    #[error("组件类型不匹配: {name}, 期望 {expected}")]
    TypeMismatch { name: String, expected: String },

    #[error("解析深度超过上限 {max_depth}: {dependency_chain}")]
    ResolutionDepthExceeded {
        max_depth: usize,
        dependency_chain: String,
    },

    #[error("容器已关闭")]
    ContainerClosed,
}

impl DependencyError {
    /// 创建组件未注册错误
    pub fn not_registered(name: impl Into<String>) -> Self {
        Self::ComponentNotRegistered { name: name.into() }
    }

    /// 创建组件创建失败错误
    pub fn creation_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ComponentCreationFailed {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// 单个销毁回调的失败记录
#[derive(Debug)]
pub struct DestroyFailure {
    /// 组件名称
    pub component: String,
    /// 销毁方法名称
    pub hook: String,
    /// 失败原因
    pub source: BoxError,
}

impl fmt::Display for DestroyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.component, self.hook, self.source)
    }
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("作用域不存在或已关闭: {scope_id}")]
    ScopeNotFound { scope_id: String },

    #[error("{} 个组件销毁失败: [{}]", .failures.len(), format_failures(.failures))]
    DestroyFailed { failures: Vec<DestroyFailure> },

    #[error("容器已关闭")]
    ContainerClosed,
}

impl LifecycleError {
    /// 收集到的销毁失败记录
    pub fn failures(&self) -> &[DestroyFailure] {
        match self {
            Self::DestroyFailed { failures } => failures,
            _ => &[],
        }
    }
}

fn format_failures(failures: &[DestroyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_failed_lists_every_failure() {
        let err = LifecycleError::DestroyFailed {
            failures: vec![
                DestroyFailure {
                    component: "a".into(),
                    hook: "close".into(),
                    source: "boom".into(),
                },
                DestroyFailure {
                    component: "b".into(),
                    hook: "shutdown".into(),
                    source: "bang".into(),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("2 个组件销毁失败"));
        assert!(message.contains("a.close: boom"));
        assert!(message.contains("b.shutdown: bang"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn no_unique_component_lists_candidates() {
        let err = DependencyError::NoUniqueComponent {
            name: "discountPolicy".into(),
            candidates: vec!["fixDiscountPolicy".into(), "rateDiscountPolicy".into()],
        };
        assert_eq!(
            err.to_string(),
            "存在多个候选组件: discountPolicy -> [fixDiscountPolicy, rateDiscountPolicy]"
        );
    }
}
