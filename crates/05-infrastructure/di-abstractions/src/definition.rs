//! 组件定义
//!
//! 描述如何构造和管理一个具名组件：工厂、依赖、生命周期、初始化和销毁回调。
//! 定义注册后不可修改。

use crate::factory::{AnyInstance, ComponentFactoryFn, ResolvedDependencies};
use infrastructure_common::{BoxError, ComponentDescriptor, Lifecycle, Lifetime, TypeInfo};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// 依赖声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// 构造前解析并注入实例
    Instance(String),
    /// 注入访问器，使用时才解析
    Provider(String),
}

impl Dependency {
    /// 依赖名称
    pub fn name(&self) -> &str {
        match self {
            Self::Instance(name) | Self::Provider(name) => name,
        }
    }

    /// 是否需要在构造前解析
    pub fn is_eager(&self) -> bool {
        matches!(self, Self::Instance(_))
    }
}

/// 生命周期回调
#[derive(Clone)]
pub struct LifecycleHook {
    method: String,
    callback: Arc<dyn Fn(&AnyInstance) -> Result<(), BoxError> + Send + Sync>,
}

impl LifecycleHook {
    /// 为具体类型创建回调
    pub fn new<T, F>(method: impl Into<String>, callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let method = method.into();
        let expected = std::any::type_name::<T>();
        let callback = move |instance: &AnyInstance| -> Result<(), BoxError> {
            let typed = instance
                .downcast_ref::<T>()
                .ok_or_else(|| format!("回调目标类型不匹配, 期望 {expected}"))?;
            callback(typed)
        };
        Self {
            method,
            callback: Arc::new(callback),
        }
    }

    /// 方法名称
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 执行回调
    pub fn invoke(&self, instance: &AnyInstance) -> Result<(), BoxError> {
        (self.callback)(instance)
    }
}

impl std::fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHook")
            .field("method", &self.method)
            .finish()
    }
}

/// 组件定义
#[derive(Clone)]
pub struct ComponentDefinition {
    name: String,
    type_info: TypeInfo,
    lifetime: Lifetime,
    factory: ComponentFactoryFn,
    dependencies: Vec<Dependency>,
    qualifiers: Vec<String>,
    primary: bool,
    lazy: bool,
    init_hook: Option<LifecycleHook>,
    destroy_hook: Option<LifecycleHook>,
}

impl ComponentDefinition {
    /// 定义单例组件
    pub fn singleton<T, F>(name: impl Into<String>, factory: F) -> DefinitionBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn(&ResolvedDependencies) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        DefinitionBuilder::new(name, Lifetime::Singleton, factory)
    }

    /// 定义原型组件
    pub fn prototype<T, F>(name: impl Into<String>, factory: F) -> DefinitionBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn(&ResolvedDependencies) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        DefinitionBuilder::new(name, Lifetime::Prototype, factory)
    }

    /// 定义作用域组件
    pub fn scoped<T, F>(name: impl Into<String>, factory: F) -> DefinitionBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn(&ResolvedDependencies) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        DefinitionBuilder::new(name, Lifetime::Scoped, factory)
    }

    /// 将已有实例定义为单例组件
    pub fn instance<T>(name: impl Into<String>, instance: Arc<T>) -> DefinitionBuilder<T>
    where
        T: Any + Send + Sync,
    {
        let factory: ComponentFactoryFn =
            Arc::new(move |_: &ResolvedDependencies| -> Result<AnyInstance, BoxError> {
                let shared: AnyInstance = instance.clone();
                Ok(shared)
            });
        DefinitionBuilder::from_parts(name.into(), Lifetime::Singleton, factory)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 依赖声明（按声明顺序）
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn init_hook(&self) -> Option<&LifecycleHook> {
        self.init_hook.as_ref()
    }

    pub fn destroy_hook(&self) -> Option<&LifecycleHook> {
        self.destroy_hook.as_ref()
    }

    /// 名称或限定符是否匹配
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.qualifiers.iter().any(|q| q == name)
    }

    /// 调用工厂创建实例
    pub fn create(&self, dependencies: &ResolvedDependencies) -> Result<AnyInstance, BoxError> {
        (self.factory)(dependencies)
    }

    /// 生成描述符
    pub fn descriptor(&self, registration_index: usize) -> ComponentDescriptor {
        let names_of = |eager: bool| -> Vec<String> {
            self.dependencies
                .iter()
                .filter(|dep| dep.is_eager() == eager)
                .map(|dep| dep.name().to_string())
                .collect()
        };

        ComponentDescriptor {
            name: self.name.clone(),
            type_info: self.type_info.clone(),
            lifetime: self.lifetime,
            dependencies: names_of(true),
            provided_dependencies: names_of(false),
            qualifiers: self.qualifiers.clone(),
            primary: self.primary,
            lazy: self.lazy,
            init_method: self.init_hook.as_ref().map(|hook| hook.method.clone()),
            destroy_method: self.destroy_hook.as_ref().map(|hook| hook.method.clone()),
            registration_index,
        }
    }
}

impl std::fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("type", &self.type_info.name)
            .field("lifetime", &self.lifetime)
            .field("dependencies", &self.dependencies)
            .field("qualifiers", &self.qualifiers)
            .field("primary", &self.primary)
            .field("lazy", &self.lazy)
            .field("init_hook", &self.init_hook)
            .field("destroy_hook", &self.destroy_hook)
            .field("factory", &"<function>")
            .finish()
    }
}

/// 组件定义构建器
///
/// 类型参数保证回调与工厂产出的实例类型一致
pub struct DefinitionBuilder<T> {
    definition: ComponentDefinition,
    _component: PhantomData<fn() -> T>,
}

impl<T> DefinitionBuilder<T>
where
    T: Any + Send + Sync,
{
    /// 创建构建器
    pub fn new<F>(name: impl Into<String>, lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&ResolvedDependencies) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory: ComponentFactoryFn =
            Arc::new(move |deps: &ResolvedDependencies| -> Result<AnyInstance, BoxError> {
                let instance: AnyInstance = Arc::new(factory(deps)?);
                Ok(instance)
            });
        Self::from_parts(name.into(), lifetime, factory)
    }

    fn from_parts(name: String, lifetime: Lifetime, factory: ComponentFactoryFn) -> Self {
        Self {
            definition: ComponentDefinition {
                name,
                type_info: TypeInfo::of::<T>(),
                lifetime,
                factory,
                dependencies: Vec::new(),
                qualifiers: Vec::new(),
                primary: false,
                lazy: false,
                init_hook: None,
                destroy_hook: None,
            },
            _component: PhantomData,
        }
    }

    /// 声明构造前注入的依赖
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.definition
            .dependencies
            .push(Dependency::Instance(name.into()));
        self
    }

    /// 声明通过访问器获取的依赖
    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.definition
            .dependencies
            .push(Dependency::Provider(name.into()));
        self
    }

    /// 添加限定符
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.definition.qualifiers.push(qualifier.into());
        self
    }

    /// 多个候选时优先选择此组件
    pub fn primary(mut self) -> Self {
        self.definition.primary = true;
        self
    }

    /// 设置是否延迟创建
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.definition.lazy = lazy;
        self
    }

    /// 设置初始化方法
    pub fn with_init_method<F>(mut self, method: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.definition.init_hook = Some(LifecycleHook::new::<T, F>(method, callback));
        self
    }

    /// 设置销毁方法
    pub fn with_destroy_method<F>(mut self, method: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.definition.destroy_hook = Some(LifecycleHook::new::<T, F>(method, callback));
        self
    }

    /// 构建定义
    pub fn build(self) -> ComponentDefinition {
        self.definition
    }
}

impl<T> DefinitionBuilder<T>
where
    T: Lifecycle + Any,
{
    /// 使用 [`Lifecycle`] 实现作为初始化和销毁回调
    pub fn with_lifecycle(self) -> Self {
        self.with_init_method("on_start", T::on_start)
            .with_destroy_method("on_stop", T::on_stop)
    }
}

impl<T> From<DefinitionBuilder<T>> for ComponentDefinition
where
    T: Any + Send + Sync,
{
    fn from(builder: DefinitionBuilder<T>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct NetworkClient {
        connects: AtomicUsize,
        disconnects: AtomicUsize,
    }

    impl Lifecycle for NetworkClient {
        fn on_start(&self) -> Result<(), BoxError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_stop(&self) -> Result<(), BoxError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn builder_records_declarations() {
        let definition = ComponentDefinition::singleton("orderService", |_| Ok(42_u32))
            .with_dependency("memberRepository")
            .with_dependency("discountPolicy")
            .with_provider("requestLogger")
            .with_qualifier("mainOrderService")
            .primary()
            .lazy(true)
            .build();

        assert_eq!(definition.name(), "orderService");
        assert_eq!(definition.lifetime(), Lifetime::Singleton);
        assert_eq!(definition.type_info().name, "u32");
        assert!(definition.answers_to("mainOrderService"));
        assert!(!definition.answers_to("discountPolicy"));

        let descriptor = definition.descriptor(7);
        assert_eq!(descriptor.dependencies, vec!["memberRepository", "discountPolicy"]);
        assert_eq!(descriptor.provided_dependencies, vec!["requestLogger"]);
        assert!(descriptor.primary);
        assert!(descriptor.lazy);
        assert_eq!(descriptor.registration_index, 7);
    }

    #[test]
    fn factory_output_is_type_erased() {
        let definition = ComponentDefinition::prototype("counter", |_| Ok(String::from("x"))).build();
        let instance = definition.create(&ResolvedDependencies::new("counter")).unwrap();
        assert_eq!(instance.downcast_ref::<String>().map(String::as_str), Some("x"));
    }

    #[test]
    fn lifecycle_trait_provides_hooks() {
        let definition = ComponentDefinition::singleton("networkClient", |_| {
            Ok(NetworkClient::default())
        })
        .with_lifecycle()
        .build();

        let instance = definition.create(&ResolvedDependencies::new("networkClient")).unwrap();
        let init = definition.init_hook().unwrap();
        let destroy = definition.destroy_hook().unwrap();
        assert_eq!(init.method(), "on_start");
        assert_eq!(destroy.method(), "on_stop");

        init.invoke(&instance).unwrap();
        destroy.invoke(&instance).unwrap();

        let client = instance.downcast_ref::<NetworkClient>().unwrap();
        assert_eq!(client.connects.load(Ordering::SeqCst), 1);
        assert_eq!(client.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_rejects_foreign_instance() {
        let hook = LifecycleHook::new::<NetworkClient, _>("close", |_| Ok(()));
        let other: AnyInstance = Arc::new(5_u8);
        assert!(hook.invoke(&other).is_err());
    }

    #[test]
    fn registered_instance_is_shared() {
        let shared = Arc::new(NetworkClient::default());
        let definition = ComponentDefinition::instance("networkClient", shared.clone()).build();
        let created = definition.create(&ResolvedDependencies::new("networkClient")).unwrap();
        let created = created.downcast::<NetworkClient>().unwrap();
        assert!(Arc::ptr_eq(&shared, &created));
    }
}
