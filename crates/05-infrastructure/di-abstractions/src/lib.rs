//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件定义、依赖解析和容器的核心接口。
//!
//! ## 核心接口
//!
//! - [`ComponentDefinition`] - 具名组件定义（工厂、依赖、生命周期、回调）
//! - [`ResolvedDependencies`] - 传递给工厂的已解析依赖
//! - [`ComponentResolver`] / [`ComponentProvider`] - 按名称解析，以及延迟解析访问器
//! - [`CircularDependencyDetector`] - 循环依赖检测
//! - [`DiContainer`] - 容器接口

pub mod container;
pub mod definition;
pub mod factory;
pub mod graph;
pub mod resolver;

pub use container::*;
pub use definition::*;
pub use factory::*;
pub use graph::*;
pub use resolver::*;
