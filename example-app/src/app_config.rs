//! 应用组件装配
//!
//! 所有组件在这里显式注册：名称、依赖、生命周期和回调。

use crate::discount::{DynDiscountPolicy, FixDiscountPolicy, RateDiscountPolicy};
use crate::member::{DynMemberRepository, MemberService, MemoryMemberRepository};
use crate::network::NetworkClient;
use crate::order::OrderService;
use crate::prototype::{ClientBean, PrototypeBean, StaleClientBean};
use crate::web::{LogDemoController, LogDemoService, MyLogger};
use di_abstractions::{ComponentDefinition, ContainerConfig, ResolvedDependencies};
use di_impl::DiContainerImpl;
use infrastructure_common::{BoxError, DependencyError};
use tracing::debug;

/// 网络客户端连接地址
pub const NETWORK_CLIENT_URL: &str = "http://hello-spring.dev";

fn memory_member_repository(_: &ResolvedDependencies) -> Result<DynMemberRepository, BoxError> {
    Ok(Box::new(MemoryMemberRepository::default()))
}

fn fix_discount_policy(_: &ResolvedDependencies) -> Result<DynDiscountPolicy, BoxError> {
    Ok(Box::new(FixDiscountPolicy::default()))
}

fn rate_discount_policy(_: &ResolvedDependencies) -> Result<DynDiscountPolicy, BoxError> {
    Ok(Box::new(RateDiscountPolicy::default()))
}

/// 会员、订单组件
pub fn domain_definitions() -> Vec<ComponentDefinition> {
    vec![
        ComponentDefinition::singleton("memberRepository", memory_member_repository).build(),
        ComponentDefinition::singleton("memberService", |deps| {
            Ok(MemberService::new(
                deps.get::<DynMemberRepository>("memberRepository")?,
            ))
        })
        .with_dependency("memberRepository")
        .build(),
        ComponentDefinition::singleton("fixDiscountPolicy", fix_discount_policy)
            .with_qualifier("discountPolicy")
            .build(),
        ComponentDefinition::singleton("rateDiscountPolicy", rate_discount_policy)
            .with_qualifier("discountPolicy")
            .with_qualifier("mainDiscountPolicy")
            .primary()
            .build(),
        ComponentDefinition::singleton("orderService", |deps| {
            Ok(OrderService::new(
                deps.get::<DynMemberRepository>("memberRepository")?,
                deps.get::<DynDiscountPolicy>("mainDiscountPolicy")?,
            ))
        })
        .with_dependency("memberRepository")
        .with_dependency("mainDiscountPolicy")
        .build(),
    ]
}

/// 请求作用域日志组件
pub fn web_definitions() -> Vec<ComponentDefinition> {
    vec![
        ComponentDefinition::scoped("myLogger", |_| Ok(MyLogger::new()))
            .with_init_method("init", MyLogger::init)
            .with_destroy_method("close", MyLogger::close)
            .build(),
        ComponentDefinition::singleton("logDemoService", |deps| {
            Ok(LogDemoService::new(deps.provider("myLogger")?))
        })
        .with_provider("myLogger")
        .build(),
        ComponentDefinition::singleton("logDemoController", |deps| {
            Ok(LogDemoController::new(
                deps.get::<LogDemoService>("logDemoService")?,
                deps.provider("myLogger")?,
            ))
        })
        .with_dependency("logDemoService")
        .with_provider("myLogger")
        .build(),
    ]
}

/// 生命周期与原型组件
pub fn lifecycle_definitions() -> Vec<ComponentDefinition> {
    vec![
        ComponentDefinition::singleton("networkClient", |_| {
            Ok(NetworkClient::new(NETWORK_CLIENT_URL))
        })
        .with_lifecycle()
        .build(),
        ComponentDefinition::prototype("prototypeBean", |_| Ok(PrototypeBean::default()))
            .with_init_method("init", |bean: &PrototypeBean| {
                debug!("PrototypeBean.init count = {}", bean.count());
                Ok(())
            })
            // 原型组件不由容器销毁，这个回调不会被调用
            .with_destroy_method("destroy", |_: &PrototypeBean| {
                debug!("PrototypeBean.destroy");
                Ok(())
            })
            .build(),
        ComponentDefinition::singleton("clientBean", |deps| {
            Ok(ClientBean::new(deps.provider("prototypeBean")?))
        })
        .with_provider("prototypeBean")
        .build(),
        ComponentDefinition::singleton("staleClientBean", |deps| {
            Ok(StaleClientBean::new(deps.get::<PrototypeBean>("prototypeBean")?))
        })
        .with_dependency("prototypeBean")
        .lazy(true)
        .build(),
    ]
}

/// 全部组件定义（按注册顺序）
pub fn definitions() -> Vec<ComponentDefinition> {
    let mut definitions = domain_definitions();
    definitions.extend(web_definitions());
    definitions.extend(lifecycle_definitions());
    definitions
}

/// 构建装配好的容器
pub async fn build_container(config: ContainerConfig) -> Result<DiContainerImpl, DependencyError> {
    definitions()
        .into_iter()
        .fold(DiContainerImpl::builder().with_config(config), |builder, definition| {
            builder.register(definition)
        })
        .build()
        .await
}
