//! IoC 容器
//!
//! - [`bean`]: bean 能力契约
//! - [`item`]: 配置条目（工厂或实例 + 注入声明）
//! - [`lifecycle`]: 上下文状态与生命周期列表
//! - [`context`]: 服务上下文

pub mod bean;
pub mod context;
mod global;
pub mod item;
pub mod lifecycle;

pub use bean::{
    downcast, expect_bool, expect_i64, expect_str, same_bean, AsAny, Bean, BeanRef, BeanType, DisposingBean,
    HookResult, InitializingBean, ModuleBean, PropertyValue, StartingBean,
};
pub use context::ServiceContext;
pub use item::{BeanFactory, ConfigurationItem, DefaultFactory, FnBeanFactory, Skeleton};
pub use lifecycle::{LifeCycle, ServiceContextState};
