//! # Infrastructure Common
//!
//! 这个 crate 提供了容器基础设施层的公共类型。
//!
//! ## 核心内容
//!
//! - [`Lifetime`] - 组件生命周期（单例、原型、作用域）
//! - [`Scope`] - 调用方管理的作用域上下文
//! - [`Lifecycle`] - 组件初始化、销毁回调
//! - [`ComponentDescriptor`] - 已注册组件的描述信息
//! - [`DependencyError`] / [`LifecycleError`] - 错误类型

pub mod component;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use component::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
