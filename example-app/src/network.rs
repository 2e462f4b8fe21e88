//! 带初始化、销毁回调的网络客户端

use infrastructure_common::{BoxError, Lifecycle};
use parking_lot::Mutex;
use tracing::info;

/// 网络客户端
///
/// 容器创建后连接，容器关闭前断开
#[derive(Debug)]
pub struct NetworkClient {
    url: String,
    events: Mutex<Vec<String>>,
}

impl NetworkClient {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        info!("构造 NetworkClient, url = {}", url);
        Self {
            url,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn connect(&self) {
        info!("connect: {}", self.url);
        self.events.lock().push(format!("connect {}", self.url));
    }

    pub fn call(&self, message: &str) {
        info!("call: {} message = {}", self.url, message);
        self.events.lock().push(format!("call {message}"));
    }

    pub fn disconnect(&self) {
        info!("close: {}", self.url);
        self.events.lock().push(format!("disconnect {}", self.url));
    }

    /// 已发生的网络事件
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl Lifecycle for NetworkClient {
    fn on_start(&self) -> Result<(), BoxError> {
        self.connect();
        self.call("初始化连接消息");
        Ok(())
    }

    fn on_stop(&self) -> Result<(), BoxError> {
        self.disconnect();
        Ok(())
    }
}
