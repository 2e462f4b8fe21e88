//! 组件工厂抽象
//!
//! 工厂以构造函数的方式接收已解析的依赖并产出组件实例

use crate::resolver::ComponentProvider;
use infrastructure_common::{BoxError, DependencyError};
use std::any::Any;
use std::sync::Arc;

/// 容器中保存的类型擦除实例
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

/// 组件工厂函数类型
pub type ComponentFactoryFn =
    Arc<dyn Fn(&ResolvedDependencies) -> Result<AnyInstance, BoxError> + Send + Sync>;

/// 将类型擦除实例转换为具体类型
pub fn downcast_instance<T>(name: &str, instance: AnyInstance) -> Result<Arc<T>, DependencyError>
where
    T: Any + Send + Sync,
{
    instance
        .downcast::<T>()
        .map_err(|_| DependencyError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// 单个已解析的依赖
#[derive(Clone)]
pub enum ResolvedDependency {
    /// 已构造并注入的实例
    Instance(AnyInstance),
    /// 使用时才解析的访问器
    Provider(ComponentProvider),
}

impl std::fmt::Debug for ResolvedDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance(<instance>)"),
            Self::Provider(provider) => f.debug_tuple("Provider").field(provider).finish(),
        }
    }
}

/// 传递给工厂的依赖集合
///
/// 按声明顺序保存，键为声明时使用的名称（可能是限定符而不是组件名）
#[derive(Debug, Clone, Default)]
pub struct ResolvedDependencies {
    owner: String,
    entries: Vec<(String, ResolvedDependency)>,
}

impl ResolvedDependencies {
    /// 为指定组件创建空的依赖集合
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            entries: Vec::new(),
        }
    }

    /// 追加依赖
    pub fn push(&mut self, name: impl Into<String>, dependency: ResolvedDependency) {
        self.entries.push((name.into(), dependency));
    }

    /// 获取类型化的实例依赖
    pub fn get<T>(&self, name: &str) -> Result<Arc<T>, DependencyError>
    where
        T: Any + Send + Sync,
    {
        match self.lookup(name)? {
            ResolvedDependency::Instance(instance) => downcast_instance(name, instance.clone()),
            ResolvedDependency::Provider(_) => Err(DependencyError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            }),
        }
    }

    /// 获取 provider 依赖
    pub fn provider(&self, name: &str) -> Result<ComponentProvider, DependencyError> {
        match self.lookup(name)? {
            ResolvedDependency::Provider(provider) => Ok(provider.clone()),
            ResolvedDependency::Instance(_) => Err(DependencyError::TypeMismatch {
                name: name.to_string(),
                expected: "ComponentProvider".to_string(),
            }),
        }
    }

    /// 依赖所属的组件名称
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// 依赖名称（按声明顺序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&ResolvedDependency, DependencyError> {
        self.entries
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, dependency)| dependency)
            .ok_or_else(|| {
                DependencyError::not_registered(format!("{} -> {} (未声明的依赖)", self.owner, name))
            })
    }
}
