//! 基础设施层
//!
//! 目前只包含 IoC 容器。

pub mod container;

pub use container::{ConfigurationItem, ServiceContext, ServiceContextState};
