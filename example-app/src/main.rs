//! # 示例应用程序
//!
//! 加载容器配置，装配组件，依次演示单例、请求作用域、原型和生命周期回调

use anyhow::Context;
use clap::Parser;
use di_abstractions::{ContainerConfig, DiContainer};
use di_impl::DiContainerImpl;
use example_app::member::{Grade, Member, MemberService};
use example_app::network::NetworkClient;
use example_app::order::OrderService;
use example_app::prototype::ClientBean;
use example_app::web::LogDemoController;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Bean container 示例应用")]
struct Args {
    /// 容器配置文件路径（TOML 或 JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 以 JSON 输出已注册的组件后退出
    #[arg(long)]
    describe: bool,

    /// 模拟的请求数量
    #[arg(long, default_value_t = 2)]
    requests: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("无效的日志级别")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("启动 bean container 示例应用");

    let config = ContainerConfig::load(args.config.as_deref()).context("加载容器配置失败")?;
    let container = example_app::build_container(config)
        .await
        .context("构建容器失败")?;

    if let Err(problems) = container.validate().await {
        for problem in &problems {
            error!("组件配置问题: {}", problem);
        }
        anyhow::bail!("容器验证失败: {} 个问题", problems.len());
    }

    if args.describe {
        let descriptors = container.registered_components().await;
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        container.close()?;
        return Ok(());
    }

    let refreshed = container.refresh().await?;
    info!("预实例化 {} 个单例", refreshed);

    demonstrate_orders(&container).await?;
    demonstrate_request_scope(&container, args.requests).await?;
    demonstrate_prototypes(&container).await?;

    let client = container
        .resolve_typed::<NetworkClient>("networkClient")
        .await?;
    info!("网络客户端事件: {:?}", client.events());

    let stats = container.stats();
    info!("容器统计: {}", serde_json::to_string(&stats)?);

    info!("正在关闭应用");
    if let Err(e) = container.close() {
        warn!("关闭容器时出现错误: {}", e);
        return Err(e.into());
    }

    info!("应用已关闭");
    Ok(())
}

/// 演示单例装配
async fn demonstrate_orders(container: &DiContainerImpl) -> anyhow::Result<()> {
    info!("演示订单服务");

    let member_service = container
        .resolve_typed::<MemberService>("memberService")
        .await?;
    let order_service = container
        .resolve_typed::<OrderService>("orderService")
        .await?;

    member_service.join(Member::new(1, "memberA", Grade::Vip));
    let order = order_service.create_order(1, "itemA", 20_000)?;
    info!(
        "订单: {} 实际支付 {}",
        serde_json::to_string(&order)?,
        order.calculate_price()
    );

    let shared = std::sync::Arc::ptr_eq(
        member_service.repository(),
        order_service.member_repository(),
    );
    info!("memberService 与 orderService 共享同一个 memberRepository: {}", shared);
    Ok(())
}

/// 演示请求作用域
async fn demonstrate_request_scope(
    container: &DiContainerImpl,
    requests: usize,
) -> anyhow::Result<()> {
    info!("演示请求作用域");

    let controller = container
        .resolve_typed::<LogDemoController>("logDemoController")
        .await?;

    for n in 0..requests {
        let request = container.open_scope(&format!("request-{n}"))?;
        let url = format!("http://localhost:8080/log-demo?request={n}");
        let response = request.run(controller.log_demo(&url)).await?;
        info!("{} -> {}", request.scope(), response);
        request.close()?;
    }
    Ok(())
}

/// 演示单例中使用原型组件
async fn demonstrate_prototypes(container: &DiContainerImpl) -> anyhow::Result<()> {
    info!("演示原型组件");

    let client = container.resolve_typed::<ClientBean>("clientBean").await?;
    let first = client.logic().await?;
    let second = client.logic().await?;
    info!("ClientBean 每次获得新的原型实例: {} {}", first, second);
    Ok(())
}
