//! # 示例应用程序
//!
//! 演示如何通过容器装配会员、订单、请求作用域日志和带生命周期回调的组件

pub mod app_config;
pub mod discount;
pub mod member;
pub mod network;
pub mod order;
pub mod prototype;
pub mod web;

pub use app_config::{build_container, definitions};
