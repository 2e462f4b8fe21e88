//! 单例中使用原型组件
//!
//! `StaleClientBean` 在构造时注入一个原型实例并一直持有；
//! `ClientBean` 持有 provider，每次调用都拿到新的原型实例。

use di_abstractions::ComponentProvider;
use infrastructure_common::DependencyError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 计数器原型组件
#[derive(Debug, Default)]
pub struct PrototypeBean {
    count: AtomicUsize,
}

impl PrototypeBean {
    pub fn add_count(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// 每次调用都解析新的原型实例
pub struct ClientBean {
    prototype: ComponentProvider,
}

impl ClientBean {
    pub fn new(prototype: ComponentProvider) -> Self {
        Self { prototype }
    }

    pub async fn logic(&self) -> Result<usize, DependencyError> {
        let prototype = self.prototype.get::<PrototypeBean>().await?;
        prototype.add_count();
        Ok(prototype.count())
    }
}

/// 构造时注入的原型实例随单例一直存活
pub struct StaleClientBean {
    prototype: Arc<PrototypeBean>,
}

impl StaleClientBean {
    pub fn new(prototype: Arc<PrototypeBean>) -> Self {
        Self { prototype }
    }

    pub fn logic(&self) -> usize {
        self.prototype.add_count();
        self.prototype.count()
    }
}
