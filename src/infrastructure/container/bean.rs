//! Bean 能力契约
//!
//! 注册到上下文的对象都实现 [`Bean`]。生命周期能力通过 `bean_types()` 声明，
//! 再由 `as_module()` 等方法做类型安全的转换，上下文据此在各阶段回调。

use super::context::ServiceContext;
use crate::errors::{BoxError, PropertyError};
use std::any::Any;
use std::sync::Arc;

/// 注入到 bean 字段中的字面值，同时也是工厂的构造参数类型
pub type PropertyValue = serde_json::Value;

/// 生命周期钩子的返回值
pub type HookResult = Result<(), BoxError>;

/// 共享的 bean 句柄
pub type BeanRef = Arc<dyn Bean>;

/// 生命周期入口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeanType {
    /// 在 INIT 状态下初始化上下文，可以继续注册新的条目，需要实现 [`ModuleBean`]
    Module,
    /// 所有模块注册完毕后调用，需要实现 [`InitializingBean`]
    Initializing,
    /// 上下文进入 RUNNING 后调用，需要实现 [`StartingBean`]
    Starting,
    /// 条目被移除或上下文被销毁时调用，需要实现 [`DisposingBean`]
    Disposing,
}

/// 向 `Arc<dyn Any>` 的转换，所有 `'static + Send + Sync` 类型自动实现
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 可以注册到 [`ServiceContext`] 的对象
///
/// 所有方法都有默认实现：默认不参与任何生命周期阶段、没有可注入字段。
/// 字段注入通过 `&self` 完成，需要注入的字段应使用内部可变性
/// （例如 `parking_lot::RwLock`）。
pub trait Bean: AsAny {
    /// 该对象参与的生命周期阶段
    fn bean_types(&self) -> Vec<BeanType> {
        Vec::new()
    }

    /// 可以被属性字典自动注入的字段名
    fn property_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// 将字段 `property` 设置为另一个已解析的 bean
    fn set_reference(&self, property: &str, _value: BeanRef) -> Result<(), PropertyError> {
        Err(PropertyError::Unknown(property.to_string()))
    }

    /// 将字段 `property` 设置为字面值
    fn set_value(&self, property: &str, _value: &PropertyValue) -> Result<(), PropertyError> {
        Err(PropertyError::Unknown(property.to_string()))
    }

    fn as_module(&self) -> Option<&dyn ModuleBean> {
        None
    }

    fn as_initializing(&self) -> Option<&dyn InitializingBean> {
        None
    }

    fn as_starting(&self) -> Option<&dyn StartingBean> {
        None
    }

    fn as_disposing(&self) -> Option<&dyn DisposingBean> {
        None
    }
}

/// 模块：上下文仍处于 INIT 时被调用，可以注册更多条目
pub trait ModuleBean: Bean {
    fn initialize_context(&self, context: &ServiceContext) -> HookResult;
}

/// 属性注入完成后的校验或初始化
pub trait InitializingBean: Bean {
    fn after_properties_set(&self) -> HookResult;
}

/// 上下文完全启动后开始工作
pub trait StartingBean: Bean {
    fn after_started(&self) -> HookResult;
}

/// 释放资源、解除事件订阅
pub trait DisposingBean: Bean {
    fn after_stopped(&self) -> HookResult;
}

/// 将 bean 句柄转换为具体类型
pub fn downcast<T: Bean>(bean: BeanRef) -> Option<Arc<T>> {
    bean.into_any().downcast::<T>().ok()
}

/// 比较两个 bean 句柄是否指向同一个对象（只比较数据指针）
pub fn same_bean(a: &BeanRef, b: &BeanRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// 从字面值中读取字符串，供 `set_value` 实现使用
pub fn expect_str<'a>(property: &str, value: &'a PropertyValue) -> Result<&'a str, PropertyError> {
    value.as_str().ok_or_else(|| PropertyError::TypeMismatch {
        property: property.to_string(),
        expected: "a string",
    })
}

/// 从字面值中读取整数，供 `set_value` 实现使用
pub fn expect_i64(property: &str, value: &PropertyValue) -> Result<i64, PropertyError> {
    value.as_i64().ok_or_else(|| PropertyError::TypeMismatch {
        property: property.to_string(),
        expected: "an integer",
    })
}

/// 从字面值中读取布尔值，供 `set_value` 实现使用
pub fn expect_bool(property: &str, value: &PropertyValue) -> Result<bool, PropertyError> {
    value.as_bool().ok_or_else(|| PropertyError::TypeMismatch {
        property: property.to_string(),
        expected: "a boolean",
    })
}
