//! # 依赖注入具体实现
//!
//! 提供具体的依赖注入容器、作用域管理和实例生命周期管理
//!
//! ```no_run
//! use di_abstractions::{ComponentDefinition, DiContainer};
//! use di_impl::DiContainerImpl;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let container = DiContainerImpl::new();
//! container
//!     .register(ComponentDefinition::singleton("greeting", |_| Ok(String::from("hello"))).build())
//!     .await?;
//!
//! let greeting = container.resolve_typed::<String>("greeting").await?;
//! assert_eq!(greeting.as_str(), "hello");
//! container.close()?;
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod container;
pub mod scope;

pub use container::{DiContainerBuilder, DiContainerImpl};
pub use scope::ScopeGuard;
