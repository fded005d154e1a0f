//! waspioc：轻量的 IoC 注册表
//!
//! 在 [`ServiceContext`] 中按名称注册工厂、实例、属性和模块，声明引用与字面值注入，
//! 然后通过 `start()` 驱动生命周期：模块 -> 初始化 bean -> 启动 bean，`dispose()` 时回调销毁 bean。
//!
//! ```ignore
//! use waspioc::{ServiceContext, ConfigLoader};
//!
//! let context = ServiceContext::new();
//! context.register_instance("log", Arc::new(Log::default()))?;
//! context
//!     .register_type::<Repository>("repository")?
//!     .reference("logger", "log")
//!     .value("table", "users");
//! context.apply_wiring(&ConfigLoader::new().load()?.wiring)?;
//! context.start()?;
//!
//! let repository = context.get::<Repository>("repository")?;
//! context.dispose()?;
//! ```

pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;
pub mod models;

pub use config::{ConfigLoader, ContextConfig, ContextOptions, WiringConfig};
pub use errors::{BoxError, ConfigError, ContainerError, PropertyError};
pub use infrastructure::container::{
    Bean, BeanRef, BeanType, ConfigurationItem, DisposingBean, HookResult, InitializingBean, LifeCycle, ModuleBean,
    PropertyValue, ServiceContext, ServiceContextState, StartingBean,
};
