//! Centralized integration tests for di-impl crate
//!
//! 使用 example-app 的组件装配验证容器在真实场景下的行为

use di_abstractions::{ComponentDefinition, ContainerConfig, DiContainer};
use di_impl::DiContainerImpl;
use example_app::discount::DynDiscountPolicy;
use example_app::member::{Grade, Member, MemberService};
use example_app::network::NetworkClient;
use example_app::order::OrderService;
use example_app::prototype::{ClientBean, PrototypeBean, StaleClientBean};
use example_app::web::{LogDemoController, MyLogger};
use infrastructure_common::{DependencyError, Lifetime};
use std::io::Write;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

async fn app_container() -> DiContainerImpl {
    example_app::build_container(ContainerConfig::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_app_definitions_are_valid() {
    let container = app_container().await;
    assert_ok!(container.validate().await);

    let names: Vec<String> = container
        .registered_components()
        .await
        .into_iter()
        .map(|descriptor| descriptor.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "memberRepository",
            "memberService",
            "fixDiscountPolicy",
            "rateDiscountPolicy",
            "orderService",
            "myLogger",
            "logDemoService",
            "logDemoController",
            "networkClient",
            "prototypeBean",
            "clientBean",
            "staleClientBean",
        ]
    );
    assert!(container.is_registered("mainDiscountPolicy").await);
    assert!(!container.is_registered("subDiscountPolicy").await);
}

#[tokio::test]
async fn test_order_service_uses_main_discount_policy() -> anyhow::Result<()> {
    let container = app_container().await;

    let member_service = container
        .resolve_typed::<MemberService>("memberService")
        .await?;
    let order_service = container
        .resolve_typed::<OrderService>("orderService")
        .await?;

    member_service.join(Member::new(1, "memberA", Grade::Vip));
    let order = order_service.create_order(1, "itemA", 20_000)?;

    assert_eq!(order.discount_price, 2000);
    assert_eq!(order.calculate_price(), 18_000);
    assert_eq!(order_service.discount_policy_name(), "rate");

    // 两个服务共享同一个 memberRepository 单例
    assert!(Arc::ptr_eq(
        member_service.repository(),
        order_service.member_repository()
    ));

    container.close()?;
    Ok(())
}

#[tokio::test]
async fn test_discount_policy_selection() {
    let container = app_container().await;

    let primary = container
        .resolve_typed::<DynDiscountPolicy>("discountPolicy")
        .await
        .unwrap();
    assert_eq!(primary.name(), "rate");

    let fixed = container
        .resolve_typed::<DynDiscountPolicy>("fixDiscountPolicy")
        .await
        .unwrap();
    assert_eq!(fixed.name(), "fix");

    let main = container
        .resolve_typed::<DynDiscountPolicy>("mainDiscountPolicy")
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&primary, &main));
}

#[tokio::test]
async fn test_ambiguous_qualifier_without_primary_fails() {
    let container = DiContainerImpl::new();
    for name in ["fixDiscountPolicy", "rateDiscountPolicy"] {
        container
            .register(
                ComponentDefinition::singleton(name, |_| Ok(()))
                    .with_qualifier("discountPolicy")
                    .build(),
            )
            .await
            .unwrap();
    }

    let err = assert_err!(container.resolve("discountPolicy").await);
    assert_eq!(
        err.to_string(),
        "存在多个候选组件: discountPolicy -> [fixDiscountPolicy, rateDiscountPolicy]"
    );
}

#[tokio::test]
async fn test_request_scope_gives_each_request_its_own_logger() -> anyhow::Result<()> {
    let container = app_container().await;
    let controller = container
        .resolve_typed::<LogDemoController>("logDemoController")
        .await?;

    let first = container.open_scope("request-1")?;
    let second = container.open_scope("request-2")?;

    assert_eq!(
        first.run(controller.log_demo("http://localhost/log-demo/1")).await?,
        "OK"
    );
    assert_eq!(
        second.run(controller.log_demo("http://localhost/log-demo/2")).await?,
        "OK"
    );

    let first_logger = first.resolve_typed::<MyLogger>("myLogger").await?;
    let second_logger = second.resolve_typed::<MyLogger>("myLogger").await?;
    assert_ne!(first_logger.uuid(), second_logger.uuid());

    let lines = first_logger.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("[http://localhost/log-demo/1] controller test"));
    assert!(lines[1].ends_with("[http://localhost/log-demo/1] service id = testId"));
    assert_eq!(second_logger.lines().len(), 2);

    first.close()?;
    assert_eq!(container.stats().open_scopes, 1);

    // 第二个请求的 logger 仍然可用
    let again = second.resolve_typed::<MyLogger>("myLogger").await?;
    assert!(Arc::ptr_eq(&second_logger, &again));
    second.close()?;

    container.close()?;
    Ok(())
}

#[tokio::test]
async fn test_request_scoped_logger_outside_request() {
    let container = app_container().await;

    let err = assert_err!(container.resolve("myLogger").await);
    assert!(matches!(err, DependencyError::NoActiveScope { .. }));

    let controller = container
        .resolve_typed::<LogDemoController>("logDemoController")
        .await
        .unwrap();
    let err = assert_err!(controller.log_demo("http://localhost/log-demo").await);
    assert!(matches!(err, DependencyError::NoActiveScope { .. }));
}

#[tokio::test]
async fn test_prototype_find() {
    let container = app_container().await;

    let first = container
        .resolve_typed::<PrototypeBean>("prototypeBean")
        .await
        .unwrap();
    first.add_count();
    assert_eq!(first.count(), 1);

    let second = container
        .resolve_typed::<PrototypeBean>("prototypeBean")
        .await
        .unwrap();
    second.add_count();
    assert_eq!(second.count(), 1);

    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_singleton_client_uses_prototype() {
    let container = app_container().await;

    // provider 每次都拿到新的原型实例
    let client = container
        .resolve_typed::<ClientBean>("clientBean")
        .await
        .unwrap();
    assert_eq!(client.logic().await.unwrap(), 1);
    let client_again = container
        .resolve_typed::<ClientBean>("clientBean")
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&client, &client_again));
    assert_eq!(client_again.logic().await.unwrap(), 1);

    // 构造时注入的原型实例随单例一直存活
    let stale = container
        .resolve_typed::<StaleClientBean>("staleClientBean")
        .await
        .unwrap();
    assert_eq!(stale.logic(), 1);
    let stale_again = container
        .resolve_typed::<StaleClientBean>("staleClientBean")
        .await
        .unwrap();
    assert_eq!(stale_again.logic(), 2);
}

#[tokio::test]
async fn test_network_client_lifecycle() {
    let container = app_container().await;

    let client = container
        .resolve_typed::<NetworkClient>("networkClient")
        .await
        .unwrap();
    assert_eq!(
        client.events(),
        vec![
            "connect http://hello-spring.dev",
            "call 初始化连接消息",
        ]
    );

    assert_ok!(container.close());
    assert_eq!(
        client.events().last().map(String::as_str),
        Some("disconnect http://hello-spring.dev")
    );
    assert_eq!(client.events().len(), 3);
}

#[tokio::test]
async fn test_eager_singletons_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "eager_singletons = true").unwrap();
    let config = ContainerConfig::load(Some(file.path())).unwrap();

    let container = example_app::build_container(config).await.unwrap();
    let descriptors = container.registered_components().await;
    let eager = descriptors
        .iter()
        .filter(|d| d.lifetime == Lifetime::Singleton && !d.lazy)
        .count();

    // 所有非延迟单例已创建，staleClientBean 为延迟组件
    assert_eq!(container.stats().active_singletons, eager);
    assert_eq!(eager, 9);

    let before = container.stats().constructed_instances;
    container
        .resolve_typed::<NetworkClient>("networkClient")
        .await
        .unwrap();
    assert_eq!(container.stats().constructed_instances, before);
}

#[tokio::test]
async fn test_registered_instance_is_the_single_shared_object() {
    #[derive(Debug)]
    struct SingletonService;

    let instance = Arc::new(SingletonService);
    let container = DiContainerImpl::new();
    container
        .register(ComponentDefinition::instance("singletonService", instance.clone()).build())
        .await
        .unwrap();

    let first = container
        .resolve_typed::<SingletonService>("singletonService")
        .await
        .unwrap();
    let second = container
        .resolve_typed::<SingletonService>("singletonService")
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&instance, &first));
    assert!(Arc::ptr_eq(&first, &second));
}
