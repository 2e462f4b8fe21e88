//! 请求作用域组件
//!
//! `MyLogger` 每个请求一个实例。控制器和服务是单例，只持有 provider，
//! 每次记录日志时才解析当前请求的 logger。

use di_abstractions::ComponentProvider;
use infrastructure_common::{BoxError, DependencyError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 请求日志记录器
#[derive(Debug)]
pub struct MyLogger {
    uuid: Uuid,
    request_url: RwLock<Option<String>>,
    lines: Mutex<Vec<String>>,
}

impl MyLogger {
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            request_url: RwLock::new(None),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn set_request_url(&self, request_url: impl Into<String>) {
        *self.request_url.write() = Some(request_url.into());
    }

    pub fn log(&self, message: &str) {
        let url = self.request_url.read().clone().unwrap_or_default();
        let line = format!("[{}] [{}] {}", self.uuid, url, message);
        info!("{}", line);
        self.lines.lock().push(line);
    }

    /// 已记录的日志行
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// 初始化回调
    pub fn init(&self) -> Result<(), BoxError> {
        info!("[{}] request scope bean create", self.uuid);
        Ok(())
    }

    /// 销毁回调
    pub fn close(&self) -> Result<(), BoxError> {
        info!("[{}] request scope bean close", self.uuid);
        Ok(())
    }
}

impl Default for MyLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志演示服务
pub struct LogDemoService {
    logger: ComponentProvider,
}

impl LogDemoService {
    pub fn new(logger: ComponentProvider) -> Self {
        Self { logger }
    }

    pub async fn logic(&self, id: &str) -> Result<(), DependencyError> {
        let logger = self.logger.get::<MyLogger>().await?;
        logger.log(&format!("service id = {id}"));
        Ok(())
    }
}

/// 日志演示控制器
pub struct LogDemoController {
    service: Arc<LogDemoService>,
    logger: ComponentProvider,
}

impl LogDemoController {
    pub fn new(service: Arc<LogDemoService>, logger: ComponentProvider) -> Self {
        Self { service, logger }
    }

    /// 处理一次请求，需要在请求作用域内调用
    pub async fn log_demo(&self, request_url: &str) -> Result<String, DependencyError> {
        let logger = self.logger.get::<MyLogger>().await?;
        logger.set_request_url(request_url);
        logger.log("controller test");

        self.service.logic("testId").await?;
        Ok("OK".to_string())
    }
}
