//! 依赖注入容器实现

use crate::cache::{InstanceCache, InstanceRecord};
use crate::scope::{active_scope, ScopeGuard, ScopeState};
use async_trait::async_trait;
use dashmap::DashMap;
use di_abstractions::{
    downcast_instance, AnyInstance, CircularDependencyDetector, ComponentDefinition,
    ComponentProvider, ComponentResolver, ContainerConfig, ContainerStats,
    DefaultCircularDependencyDetector, Dependency, DependencyGraphNode, DestroyOrder, DiContainer,
    ResolveContext, ResolvedDependencies, ResolvedDependency,
};
use futures::future::{BoxFuture, FutureExt};
use infrastructure_common::{
    ComponentDescriptor, DependencyError, LifecycleError, Lifetime, Scope,
};
use parking_lot::Mutex;
use std::any::Any;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 已注册的组件及其注册序号
#[derive(Clone)]
struct Registered {
    index: usize,
    definition: Arc<ComponentDefinition>,
}

/// 组件定义表（按注册顺序）
#[derive(Default)]
struct Registry {
    definitions: Vec<Arc<ComponentDefinition>>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    fn insert(&mut self, definition: ComponentDefinition) -> Result<usize, DependencyError> {
        if self.by_name.contains_key(definition.name()) {
            return Err(DependencyError::DuplicateDefinition {
                name: definition.name().to_string(),
            });
        }

        let index = self.definitions.len();
        self.by_name.insert(definition.name().to_string(), index);
        self.definitions.push(Arc::new(definition));
        Ok(index)
    }

    /// 按名称查找；名称未命中时按限定符查找，多个候选时取唯一的主组件
    fn lookup(&self, name: &str) -> Result<Registered, DependencyError> {
        if let Some(&index) = self.by_name.get(name) {
            return Ok(self.entry(index));
        }

        let candidates: Vec<usize> = self
            .definitions
            .iter()
            .enumerate()
            .filter(|(_, definition)| definition.answers_to(name))
            .map(|(index, _)| index)
            .collect();

        match candidates.as_slice() {
            [] => Err(DependencyError::not_registered(name)),
            [index] => Ok(self.entry(*index)),
            _ => {
                let primaries: Vec<usize> = candidates
                    .iter()
                    .copied()
                    .filter(|&index| self.definitions[index].is_primary())
                    .collect();
                match primaries.as_slice() {
                    [index] => Ok(self.entry(*index)),
                    _ => Err(DependencyError::NoUniqueComponent {
                        name: name.to_string(),
                        candidates: candidates
                            .iter()
                            .map(|&index| self.definitions[index].name().to_string())
                            .collect(),
                    }),
                }
            }
        }
    }

    fn entry(&self, index: usize) -> Registered {
        Registered {
            index,
            definition: self.definitions[index].clone(),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.definitions
            .iter()
            .any(|definition| definition.answers_to(name))
    }

    /// 构造期依赖图，限定符已解析为组件名称；无法解析的依赖作为错误返回
    fn dependency_graph(&self) -> (Vec<DependencyGraphNode>, Vec<DependencyError>) {
        let mut nodes = Vec::with_capacity(self.definitions.len());
        let mut errors = Vec::new();

        for definition in &self.definitions {
            let mut dependencies = Vec::new();
            for dependency in definition.dependencies() {
                match self.lookup(dependency.name()) {
                    Ok(target) if dependency.is_eager() => {
                        dependencies.push(target.definition.name().to_string());
                    }
                    Ok(_) => {}
                    Err(DependencyError::ComponentNotRegistered { name }) => {
                        errors.push(DependencyError::not_registered(format!(
                            "{} -> {}",
                            definition.name(),
                            name
                        )));
                    }
                    Err(e) => errors.push(e),
                }
            }
            nodes.push(DependencyGraphNode::new(definition.name(), dependencies));
        }

        (nodes, errors)
    }

    /// 单例经由构造期依赖（可穿过原型组件）持有作用域组件的情况
    fn scope_mismatches(&self) -> Vec<DependencyError> {
        let mut errors = Vec::new();

        let singletons = self
            .definitions
            .iter()
            .filter(|definition| definition.lifetime() == Lifetime::Singleton);
        for singleton in singletons {
            let mut pending = eager_dependencies(singleton);
            let mut seen = HashSet::new();

            while let Some(name) = pending.pop() {
                let Ok(target) = self.lookup(&name) else {
                    continue;
                };
                let target = target.definition;
                if !seen.insert(target.name().to_string()) {
                    continue;
                }
                match target.lifetime() {
                    Lifetime::Scoped => {
                        errors.push(scope_mismatch(singleton.name(), target.name()));
                    }
                    Lifetime::Prototype => pending.extend(eager_dependencies(&target)),
                    Lifetime::Singleton => {}
                }
            }
        }

        errors
    }
}

fn eager_dependencies(definition: &ComponentDefinition) -> Vec<String> {
    definition
        .dependencies()
        .iter()
        .filter(|dependency| dependency.is_eager())
        .map(|dependency| dependency.name().to_string())
        .collect()
}

fn scope_mismatch(consumer: &str, dependency: &str) -> DependencyError {
    DependencyError::ScopeMismatch {
        consumer: consumer.to_string(),
        consumer_lifetime: Lifetime::Singleton.to_string(),
        dependency: dependency.to_string(),
        dependency_lifetime: Lifetime::Scoped.to_string(),
    }
}

/// 容器共享状态
pub(crate) struct ContainerState {
    config: ContainerConfig,
    registry: RwLock<Registry>,
    singletons: InstanceCache,
    scopes: DashMap<Uuid, Arc<ScopeState>>,
    detector: Box<dyn CircularDependencyDetector>,
    /// 已确认无环的根组件，注册新组件时清空
    acyclic: Mutex<HashSet<String>>,
    closed: AtomicBool,
    scope_sequence: AtomicU64,
    registered: AtomicUsize,
    constructed: AtomicUsize,
    resolution_errors: AtomicUsize,
    this: Weak<ContainerState>,
}

impl ContainerState {
    fn new(config: ContainerConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            config,
            registry: RwLock::new(Registry::default()),
            singletons: InstanceCache::new("singletons"),
            scopes: DashMap::new(),
            detector: Box::new(DefaultCircularDependencyDetector),
            acyclic: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            scope_sequence: AtomicU64::new(0),
            registered: AtomicUsize::new(0),
            constructed: AtomicUsize::new(0),
            resolution_errors: AtomicUsize::new(0),
            this: this.clone(),
        })
    }

    fn ensure_open(&self) -> Result<(), DependencyError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DependencyError::ContainerClosed);
        }
        Ok(())
    }

    async fn register(&self, definition: ComponentDefinition) -> Result<(), DependencyError> {
        self.ensure_open()?;

        let name = definition.name().to_string();
        let lifetime = definition.lifetime();
        let type_name = definition.type_info().name.clone();

        let mut registry = self.registry.write().await;
        let index = registry.insert(definition)?;
        self.acyclic.lock().clear();
        self.registered
            .store(registry.definitions.len(), Ordering::Release);

        info!("注册组件: {} ({}, {}) #{}", name, lifetime, type_name, index);
        Ok(())
    }

    fn scope_state(&self, name: &str, scope: &Scope) -> Result<Arc<ScopeState>, DependencyError> {
        self.scopes
            .get(&scope.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DependencyError::NoActiveScope {
                name: name.to_string(),
            })
    }

    /// 从外部发起的一次解析
    pub(crate) async fn resolve_root(
        &self,
        name: &str,
        scope: Option<Arc<ScopeState>>,
    ) -> Result<AnyInstance, DependencyError> {
        let ctx = ResolveContext::new(self.config.max_resolution_depth);
        let result = self.resolve_with(name, ctx, scope).await;
        if let Err(e) = &result {
            self.resolution_errors.fetch_add(1, Ordering::Relaxed);
            debug!("解析组件失败: {} - {}", name, e);
        }
        result
    }

    fn resolve_with<'a>(
        &'a self,
        name: &'a str,
        ctx: ResolveContext,
        scope: Option<Arc<ScopeState>>,
    ) -> BoxFuture<'a, Result<AnyInstance, DependencyError>> {
        self.resolve_named(name, ctx, scope).boxed()
    }

    async fn resolve_named(
        &self,
        name: &str,
        mut ctx: ResolveContext,
        scope: Option<Arc<ScopeState>>,
    ) -> Result<AnyInstance, DependencyError> {
        self.ensure_open()?;

        let registered = self.registry.read().await.lookup(name)?;
        let definition = registered.definition.clone();
        let lifetime = definition.lifetime();

        match lifetime {
            Lifetime::Singleton => {
                if let Some(instance) = self.singletons.cached(definition.name()) {
                    return Ok(instance);
                }
            }
            Lifetime::Scoped => {
                if let Some(owner) = &ctx.singleton_owner {
                    return Err(scope_mismatch(owner, definition.name()));
                }
                let cached = scope
                    .as_ref()
                    .and_then(|state| state.cache().cached(definition.name()));
                if let Some(instance) = cached {
                    return Ok(instance);
                }
            }
            Lifetime::Prototype => {}
        }

        let root = ctx.depth() == 0;
        ctx.push(definition.name())?;
        if root {
            self.ensure_acyclic(definition.name()).await?;
        }

        match lifetime {
            Lifetime::Singleton => {
                self.resolve_cached(&registered, &self.singletons, &ctx, &scope)
                    .await
            }
            Lifetime::Prototype => {
                let instance = self.construct(&definition, &ctx, &scope).await?;
                self.initialize(&definition, &instance)?;
                Ok(instance)
            }
            Lifetime::Scoped => {
                let state = scope
                    .clone()
                    .filter(|state| !state.cache().is_closed())
                    .ok_or_else(|| DependencyError::NoActiveScope {
                        name: definition.name().to_string(),
                    })?;
                self.resolve_cached(&registered, state.cache(), &ctx, &scope)
                    .await
            }
        }
    }

    /// 在缓存中获取或创建实例，同一缓存内每个组件最多构造一次
    async fn resolve_cached(
        &self,
        registered: &Registered,
        cache: &InstanceCache,
        ctx: &ResolveContext,
        scope: &Option<Arc<ScopeState>>,
    ) -> Result<AnyInstance, DependencyError> {
        let slot = cache.slot(registered.definition.name());
        let instance = slot
            .get_or_try_init(|| self.create_cached(registered, cache, ctx, scope))
            .await?;
        Ok(instance.clone())
    }

    /// 构造、初始化并登记一个缓存实例
    async fn create_cached(
        &self,
        registered: &Registered,
        cache: &InstanceCache,
        ctx: &ResolveContext,
        scope: &Option<Arc<ScopeState>>,
    ) -> Result<AnyInstance, DependencyError> {
        let definition = registered.definition.as_ref();
        let instance = self.construct(definition, ctx, scope).await?;
        self.initialize(definition, &instance)?;

        let record = InstanceRecord::initialized(definition, registered.index, instance.clone());
        if let Err(mut rejected) = cache.track(record) {
            // 构造期间缓存已关闭
            if let Err(failure) = rejected.destroy() {
                warn!("丢弃实例时销毁失败: {}", failure);
            }
            return Err(match definition.lifetime() {
                Lifetime::Scoped => DependencyError::NoActiveScope {
                    name: definition.name().to_string(),
                },
                _ => DependencyError::ContainerClosed,
            });
        }

        Ok(instance)
    }

    /// 按声明顺序解析依赖并调用工厂
    async fn construct(
        &self,
        definition: &ComponentDefinition,
        ctx: &ResolveContext,
        scope: &Option<Arc<ScopeState>>,
    ) -> Result<AnyInstance, DependencyError> {
        let mut child_ctx = ctx.clone();
        if definition.lifetime() == Lifetime::Singleton {
            child_ctx.singleton_owner = Some(definition.name().to_string());
        }

        let mut resolved = ResolvedDependencies::new(definition.name());
        for dependency in definition.dependencies() {
            match dependency {
                Dependency::Instance(name) => {
                    let instance = self
                        .resolve_with(name, child_ctx.clone(), scope.clone())
                        .await?;
                    resolved.push(name.clone(), ResolvedDependency::Instance(instance));
                }
                Dependency::Provider(name) => {
                    let resolver: Weak<dyn ComponentResolver> = self.this.clone();
                    let provider = ComponentProvider::new(name.clone(), resolver);
                    resolved.push(name.clone(), ResolvedDependency::Provider(provider));
                }
            }
        }

        let instance = definition
            .create(&resolved)
            .map_err(|source| DependencyError::creation_failed(definition.name(), source))?;
        self.constructed.fetch_add(1, Ordering::Relaxed);
        debug!("创建组件实例: {} ({})", definition.name(), definition.lifetime());

        Ok(instance)
    }

    /// 执行初始化回调；失败时实例被丢弃，不缓存也不销毁
    fn initialize(
        &self,
        definition: &ComponentDefinition,
        instance: &AnyInstance,
    ) -> Result<(), DependencyError> {
        let Some(hook) = definition.init_hook() else {
            return Ok(());
        };

        hook.invoke(instance)
            .map_err(|source| DependencyError::InitHookFailed {
                name: definition.name().to_string(),
                hook: hook.method().to_string(),
                source,
            })?;
        debug!("初始化组件: {}.{}", definition.name(), hook.method());
        Ok(())
    }

    /// 首次从某个根组件解析前检查其可达的依赖图
    ///
    /// 总是在进入任何实例槽之前执行，并发任务从环的不同位置进入时也不会互相等待
    async fn ensure_acyclic(&self, root: &str) -> Result<(), DependencyError> {
        if self.acyclic.lock().contains(root) {
            return Ok(());
        }

        let registry = self.registry.read().await;
        let (graph, _) = registry.dependency_graph();
        self.detector.detect_from(root, &graph)?;
        self.acyclic.lock().insert(root.to_string());
        Ok(())
    }

    async fn refresh(&self) -> Result<usize, DependencyError> {
        self.ensure_open()?;

        let eager: Vec<String> = self
            .registry
            .read()
            .await
            .definitions
            .iter()
            .filter(|definition| {
                definition.lifetime() == Lifetime::Singleton && !definition.is_lazy()
            })
            .map(|definition| definition.name().to_string())
            .collect();

        let before = self.singletons.live_count();
        for name in &eager {
            self.resolve_root(name, None).await?;
        }
        let created = self.singletons.live_count().saturating_sub(before);

        info!("预实例化单例完成: 新建 {} 个", created);
        Ok(created)
    }

    async fn validate(&self) -> Result<(), Vec<DependencyError>> {
        self.ensure_open().map_err(|e| vec![e])?;

        let registry = self.registry.read().await;
        let (graph, mut errors) = registry.dependency_graph();
        if self.config.enable_circular_dependency_detection {
            if let Err(e) = self.detector.detect_circular_dependencies(&graph) {
                errors.push(e);
            }
        }
        errors.extend(registry.scope_mismatches());

        if errors.is_empty() {
            info!("容器验证通过: {} 个组件", registry.definitions.len());
            Ok(())
        } else {
            warn!("容器验证发现 {} 个问题", errors.len());
            Err(errors)
        }
    }

    fn open_scope(&self, name: &str) -> Result<Arc<ScopeState>, DependencyError> {
        self.ensure_open()?;

        let sequence = self.scope_sequence.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(ScopeState::new(Scope::new(name), sequence));
        let id = state.scope().id;
        self.scopes.insert(id, state.clone());

        // 与 close 并发时不留下无人关闭的作用域
        if self.closed.load(Ordering::Acquire) {
            self.scopes.remove(&id);
            return Err(DependencyError::ContainerClosed);
        }

        info!("打开作用域: {}", state.scope());
        Ok(state)
    }

    fn close_scope(&self, scope: &Scope) -> Result<(), LifecycleError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LifecycleError::ContainerClosed);
        }
        let (_, state) =
            self.scopes
                .remove(&scope.id)
                .ok_or_else(|| LifecycleError::ScopeNotFound {
                    scope_id: scope.id.to_string(),
                })?;

        let failures = state.cache().close(DestroyOrder::ReverseCreation);
        info!("关闭作用域: {}", state.scope());

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::DestroyFailed { failures })
        }
    }

    fn close(&self) -> Result<(), LifecycleError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(LifecycleError::ContainerClosed);
        }
        info!("正在关闭容器");

        let ids: Vec<Uuid> = self.scopes.iter().map(|entry| *entry.key()).collect();
        let mut open_scopes: Vec<Arc<ScopeState>> = ids
            .iter()
            .filter_map(|id| self.scopes.remove(id))
            .map(|(_, state)| state)
            .collect();
        open_scopes.sort_by_key(|state| Reverse(state.sequence()));

        let mut failures = Vec::new();
        for state in open_scopes {
            debug!("关闭未关闭的作用域: {}", state.scope());
            failures.extend(state.cache().close(DestroyOrder::ReverseCreation));
        }
        failures.extend(self.singletons.close(self.config.destroy_order));

        if failures.is_empty() {
            info!("容器已关闭");
            Ok(())
        } else {
            warn!("容器已关闭, {} 个组件销毁失败", failures.len());
            Err(LifecycleError::DestroyFailed { failures })
        }
    }

    fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_components: self.registered.load(Ordering::Acquire),
            active_singletons: self.singletons.live_count(),
            open_scopes: self.scopes.len(),
            constructed_instances: self.constructed.load(Ordering::Relaxed),
            resolution_errors: self.resolution_errors.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ComponentResolver for ContainerState {
    async fn resolve_by_name(&self, name: &str) -> Result<AnyInstance, DependencyError> {
        self.resolve_root(name, active_scope()).await
    }

    async fn resolve_in_scope(
        &self,
        name: &str,
        scope: &Scope,
    ) -> Result<AnyInstance, DependencyError> {
        let state = self.scope_state(name, scope)?;
        self.resolve_root(name, Some(state)).await
    }
}

/// 具体的依赖注入容器实现
///
/// 克隆得到的是同一个容器的句柄
#[derive(Clone)]
pub struct DiContainerImpl {
    state: Arc<ContainerState>,
}

impl DiContainerImpl {
    /// 使用默认配置创建容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建容器
    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            state: ContainerState::new(config),
        }
    }

    /// 创建容器构建器
    pub fn builder() -> DiContainerBuilder {
        DiContainerBuilder::new()
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.state.config
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// 解析组件并转换为具体类型
    pub async fn resolve_typed<T>(&self, name: &str) -> Result<Arc<T>, DependencyError>
    where
        T: Any + Send + Sync,
    {
        downcast_instance(name, self.resolve(name).await?)
    }

    /// 获取组件访问器，每次调用 `get` 时才解析
    pub fn provider(&self, name: impl Into<String>) -> ComponentProvider {
        let resolver: Weak<dyn ComponentResolver> = self.state.this.clone();
        ComponentProvider::new(name, resolver)
    }

    pub(crate) async fn resolve_with_scope(
        &self,
        name: &str,
        scope: Option<Arc<ScopeState>>,
    ) -> Result<AnyInstance, DependencyError> {
        self.state.resolve_root(name, scope).await
    }
}

impl Default for DiContainerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiContainerImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiContainerImpl")
            .field("config", &self.state.config)
            .field("stats", &self.state.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl DiContainer for DiContainerImpl {
    type ScopeHandle = ScopeGuard;

    async fn register(&self, definition: ComponentDefinition) -> Result<(), DependencyError> {
        self.state.register(definition).await
    }

    async fn resolve(&self, name: &str) -> Result<AnyInstance, DependencyError> {
        self.state.resolve_root(name, active_scope()).await
    }

    async fn resolve_in_scope(
        &self,
        name: &str,
        scope: &Scope,
    ) -> Result<AnyInstance, DependencyError> {
        ComponentResolver::resolve_in_scope(self.state.as_ref(), name, scope).await
    }

    async fn refresh(&self) -> Result<usize, DependencyError> {
        self.state.refresh().await
    }

    fn open_scope(&self, name: &str) -> Result<ScopeGuard, DependencyError> {
        let state = self.state.open_scope(name)?;
        Ok(ScopeGuard::new(self.clone(), state))
    }

    fn close_scope(&self, scope: &Scope) -> Result<(), LifecycleError> {
        self.state.close_scope(scope)
    }

    fn close(&self) -> Result<(), LifecycleError> {
        self.state.close()
    }

    async fn is_registered(&self, name: &str) -> bool {
        self.state.registry.read().await.contains(name)
    }

    async fn registered_components(&self) -> Vec<ComponentDescriptor> {
        self.state
            .registry
            .read()
            .await
            .definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| definition.descriptor(index))
            .collect()
    }

    async fn validate(&self) -> Result<(), Vec<DependencyError>> {
        self.state.validate().await
    }

    fn stats(&self) -> ContainerStats {
        self.state.stats()
    }
}

/// 容器构建器
#[derive(Default)]
pub struct DiContainerBuilder {
    config: ContainerConfig,
    definitions: Vec<ComponentDefinition>,
}

impl DiContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置容器配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 添加组件定义
    pub fn register(mut self, definition: impl Into<ComponentDefinition>) -> Self {
        self.definitions.push(definition.into());
        self
    }

    /// 构建容器；配置了 `eager_singletons` 时立即创建所有非延迟单例
    pub async fn build(self) -> Result<DiContainerImpl, DependencyError> {
        let container = DiContainerImpl::with_config(self.config);

        let registration_count = self.definitions.len();
        for definition in self.definitions {
            container.register(definition).await?;
        }

        if container.config().eager_singletons {
            container.refresh().await?;
        }

        info!("构建容器完成，注册了 {} 个组件", registration_count);
        Ok(container)
    }
}
