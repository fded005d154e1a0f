//! 配置条目
//!
//! 包装一个工厂或现成实例，第一次取值时完成引用和字面值的注入，之后只读缓存。

use super::bean::{Bean, BeanRef, PropertyValue};
use super::context::ServiceContext;
use crate::errors::{BoxError, ContainerError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Bean 工厂
pub trait BeanFactory: Send + Sync {
    /// 使用构造参数创建新实例
    fn create(&self, args: Option<&PropertyValue>) -> Result<BeanRef, BoxError>;

    /// 产出类型的名称（用于日志和错误信息）
    fn bean_type_name(&self) -> &'static str;
}

/// 闭包工厂
pub struct FnBeanFactory<F, T> {
    factory_fn: F,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<F, T> FnBeanFactory<F, T>
where
    F: Fn(Option<&PropertyValue>) -> Result<T, BoxError> + Send + Sync + 'static,
    T: Bean,
{
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<F, T> BeanFactory for FnBeanFactory<F, T>
where
    F: Fn(Option<&PropertyValue>) -> Result<T, BoxError> + Send + Sync + 'static,
    T: Bean,
{
    fn create(&self, args: Option<&PropertyValue>) -> Result<BeanRef, BoxError> {
        let bean = (self.factory_fn)(args)?;
        Ok(Arc::new(bean))
    }

    fn bean_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// 无参构造的工厂，忽略构造参数
pub struct DefaultFactory<T>(std::marker::PhantomData<fn() -> T>);

impl<T> DefaultFactory<T> {
    pub fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T> Default for DefaultFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Bean + Default> BeanFactory for DefaultFactory<T> {
    fn create(&self, _args: Option<&PropertyValue>) -> Result<BeanRef, BoxError> {
        Ok(Arc::new(T::default()))
    }

    fn bean_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// 条目的骨架：需要构造的工厂，或者现成的实例
#[derive(Clone)]
pub enum Skeleton {
    Factory(Arc<dyn BeanFactory>),
    Instance(BeanRef),
}

impl std::fmt::Debug for Skeleton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skeleton::Factory(factory) => write!(f, "Factory({})", factory.bean_type_name()),
            Skeleton::Instance(_) => write!(f, "Instance"),
        }
    }
}

#[derive(Default)]
struct ItemState {
    references: IndexMap<String, String>,
    values: IndexMap<String, PropertyValue>,
    constructor_arguments: Option<PropertyValue>,
    value: Option<BeanRef>,
    initiated: bool,
}

/// 上下文中的一个具名配置
///
/// 通过 `register*` 得到，之后可以链式声明注入：
///
/// ```ignore
/// context
///     .register_type::<Repository>("repository")?
///     .reference("logger", "log")
///     .value("table", "users");
/// ```
pub struct ConfigurationItem {
    name: String,
    skeleton: Skeleton,
    state: Mutex<ItemState>,
}

impl ConfigurationItem {
    pub fn new(name: impl Into<String>, skeleton: Skeleton) -> Self {
        Self {
            name: name.into(),
            skeleton,
            state: Mutex::new(ItemState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// 骨架是否为现成实例
    pub fn is_instance(&self) -> bool {
        matches!(self.skeleton, Skeleton::Instance(_))
    }

    /// 注入是否已经执行过
    pub fn is_initiated(&self) -> bool {
        self.state.lock().initiated
    }

    /// 已解析的值，尚未解析时为 `None`
    pub fn cached_value(&self) -> Option<BeanRef> {
        self.state.lock().value.clone()
    }

    /// 已解析的值；尚未解析时退回到注册的现成实例，工厂条目返回 `None`
    pub fn instance_or_cached(&self) -> Option<BeanRef> {
        match (self.cached_value(), &self.skeleton) {
            (Some(value), _) => Some(value),
            (None, Skeleton::Instance(instance)) => Some(instance.clone()),
            (None, Skeleton::Factory(_)) => None,
        }
    }

    /// 注入时把字段 `property` 设置为上下文中 `configuration_name` 的解析结果
    pub fn reference(&self, property: impl Into<String>, configuration_name: impl Into<String>) -> &Self {
        self.state
            .lock()
            .references
            .insert(property.into(), configuration_name.into());
        self
    }

    /// 注入时把字段 `property` 设置为字面值
    pub fn value(&self, property: impl Into<String>, value: impl Into<PropertyValue>) -> &Self {
        self.state.lock().values.insert(property.into(), value.into());
        self
    }

    /// 设置工厂的构造参数
    pub fn construct(&self, args: impl Into<PropertyValue>) -> &Self {
        self.state.lock().constructor_arguments = Some(args.into());
        self
    }

    /// 返回可用的值
    ///
    /// 第一次调用时构造（或取出实例）并缓存，然后先注入引用再注入字面值；
    /// 同名字段以字面值为准。之后的调用只读缓存。
    pub fn resolve(&self, context: &ServiceContext) -> Result<BeanRef, ContainerError> {
        let (cached, arguments) = {
            let state = self.state.lock();
            (state.value.clone(), state.constructor_arguments.clone())
        };

        // 工厂在锁外调用
        let item = match (cached, &self.skeleton) {
            (Some(cached), _) => cached,
            (None, Skeleton::Instance(instance)) => instance.clone(),
            (None, Skeleton::Factory(factory)) => {
                tracing::debug!(
                    item = %self.name,
                    bean_type = factory.bean_type_name(),
                    "Constructing bean"
                );
                factory
                    .create(arguments.as_ref())
                    .map_err(|source| ContainerError::CreationFailed {
                        name: self.name.clone(),
                        source,
                    })?
            }
        };

        // 标记先于注入，注入期间再次解析本条目会拿到缓存值
        let wiring = {
            let mut state = self.state.lock();
            if state.initiated {
                None
            } else {
                state.value = Some(item.clone());
                state.initiated = true;
                Some((state.references.clone(), state.values.clone()))
            }
        };

        // 注入期间不持有锁，引用解析可能再次进入本条目
        if let Some((references, values)) = wiring {
            for (property, target) in &references {
                let referenced = context.get_item(target)?;
                item.set_reference(property, referenced)
                    .map_err(|source| self.wiring_error(source))?;
            }
            for (property, value) in &values {
                item.set_value(property, value)
                    .map_err(|source| self.wiring_error(source))?;
            }
        }

        Ok(item)
    }

    fn wiring_error(&self, source: crate::errors::PropertyError) -> ContainerError {
        ContainerError::Wiring {
            item: self.name.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for ConfigurationItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConfigurationItem")
            .field("name", &self.name)
            .field("skeleton", &self.skeleton)
            .field("references", &state.references)
            .field("values", &state.values)
            .field("initiated", &state.initiated)
            .finish()
    }
}
