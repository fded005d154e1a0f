//! 服务上下文
//!
//! 注册表和状态机：持有配置、实例、属性、模块四个字典，并驱动
//! INIT -> STARTING -> RUNNING -> DISPOSED 的生命周期（启动失败时进入 TERMINATED）。
//!
//! 内部锁只在读写字典时短暂持有，调用工厂、注入字段和执行钩子时都不持锁，
//! 因此钩子可以重新进入上下文（例如模块在 `initialize_context` 中继续注册）。
//! 上下文按单线程使用设计，并发修改的结果没有定义。

use super::bean::{downcast, Bean, BeanRef, BeanType, PropertyValue};
use super::item::{BeanFactory, ConfigurationItem, DefaultFactory, FnBeanFactory, Skeleton};
use super::lifecycle::{LifeCycle, ServiceContextState};
use crate::config::{ContextOptions, WiringConfig};
use crate::errors::{BoxError, ContainerError};
use crate::logging::OperationTimer;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Dictionary = IndexMap<String, Arc<ConfigurationItem>>;

#[derive(Default)]
struct Registry {
    configurations: Dictionary,
    instances: Dictionary,
    properties: Dictionary,
    modules: Dictionary,
    properties_initialized: HashSet<String>,
    lifecycle: LifeCycle,
}

impl Registry {
    /// `get_item` 的查找顺序：先实例，再配置
    fn resolvable(&self, name: &str) -> Option<Arc<ConfigurationItem>> {
        self.instances
            .get(name)
            .or_else(|| self.configurations.get(name))
            .cloned()
    }

    fn any(&self, name: &str) -> Option<Arc<ConfigurationItem>> {
        self.instances
            .get(name)
            .or_else(|| self.configurations.get(name))
            .or_else(|| self.properties.get(name))
            .or_else(|| self.modules.get(name))
            .cloned()
    }
}

/// 服务上下文
pub struct ServiceContext {
    options: ContextOptions,
    state: RwLock<ServiceContextState>,
    registry: Mutex<Registry>,
    disposing: AtomicBool,
    resolution_stack: Mutex<Vec<String>>,
}

const REGISTRATION_STATES: &[ServiceContextState] = &[ServiceContextState::Init];
const RESOLUTION_STATES: &[ServiceContextState] =
    &[ServiceContextState::Starting, ServiceContextState::Running];
const LIVE_STATES: &[ServiceContextState] = &[
    ServiceContextState::Init,
    ServiceContextState::Starting,
    ServiceContextState::Running,
];

impl ServiceContext {
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    pub fn with_options(options: ContextOptions) -> Self {
        Self {
            options,
            state: RwLock::new(ServiceContextState::Init),
            registry: Mutex::new(Registry::default()),
            disposing: AtomicBool::new(false),
            resolution_stack: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn current_state(&self) -> ServiceContextState {
        *self.state.read()
    }

    /// 各生命周期列表的快照
    pub fn lifecycle(&self) -> LifeCycle {
        self.registry.lock().lifecycle.clone()
    }

    /// 名称是否存在于任意一个字典中
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.lock().any(name).is_some()
    }

    /// 所有已注册的名称：配置、实例、属性、模块，按注册顺序，不重复
    pub fn registered_names(&self) -> Vec<String> {
        let registry = self.registry.lock();
        let mut names: Vec<String> = Vec::new();
        for name in registry
            .configurations
            .keys()
            .chain(registry.instances.keys())
            .chain(registry.properties.keys())
            .chain(registry.modules.keys())
        {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    fn ensure_state(&self, allowed: &[ServiceContextState]) -> Result<(), ContainerError> {
        let actual = self.current_state();
        if allowed.contains(&actual) {
            return Ok(());
        }
        tracing::error!(
            context = %self.options.name,
            expected = ?allowed,
            actual = %actual,
            "Wrong context state"
        );
        Err(ContainerError::wrong_state(allowed, actual))
    }

    fn set_state(&self, next: ServiceContextState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        tracing::info!(
            context = %self.options.name,
            from = %previous,
            to = %next,
            "Context state changed"
        );
    }

    // ---- 注册 ----

    /// 注册一个由闭包构造的条目，闭包接收 `construct()` 设置的参数
    pub fn register<T, F>(&self, name: impl Into<String>, factory: F) -> Result<Arc<ConfigurationItem>, ContainerError>
    where
        F: Fn(Option<&PropertyValue>) -> Result<T, BoxError> + Send + Sync + 'static,
        T: Bean,
    {
        self.register_factory(name, Arc::new(FnBeanFactory::new(factory)))
    }

    /// 注册一个无参构造的类型
    pub fn register_type<T: Bean + Default>(&self, name: impl Into<String>) -> Result<Arc<ConfigurationItem>, ContainerError> {
        self.register_factory(name, Arc::new(DefaultFactory::<T>::new()))
    }

    /// 注册一个工厂，同名条目会被替换
    pub fn register_factory(
        &self,
        name: impl Into<String>,
        factory: Arc<dyn BeanFactory>,
    ) -> Result<Arc<ConfigurationItem>, ContainerError> {
        let name = name.into();
        self.ensure_state(REGISTRATION_STATES)?;
        let item = Arc::new(ConfigurationItem::new(name.clone(), Skeleton::Factory(factory)));
        self.registry.lock().configurations.insert(name.clone(), item.clone());
        tracing::debug!(context = %self.options.name, item = %name, "Registered configuration");
        Ok(item)
    }

    /// 注册现成实例，解析时总是返回这个实例
    pub fn register_instance(&self, name: impl Into<String>, instance: BeanRef) -> Result<Arc<ConfigurationItem>, ContainerError> {
        let name = name.into();
        self.ensure_state(REGISTRATION_STATES)?;
        let item = Arc::new(ConfigurationItem::new(name.clone(), Skeleton::Instance(instance)));
        self.registry.lock().instances.insert(name.clone(), item.clone());
        tracing::debug!(context = %self.options.name, item = %name, "Registered instance");
        Ok(item)
    }

    /// 注册属性：任何声明了同名字段的 bean 在第一次 `get_item` 时都会被注入该值
    pub fn register_property(&self, name: impl Into<String>, instance: BeanRef) -> Result<Arc<ConfigurationItem>, ContainerError> {
        let name = name.into();
        self.ensure_state(REGISTRATION_STATES)?;
        let item = Arc::new(ConfigurationItem::new(name.clone(), Skeleton::Instance(instance)));
        self.registry.lock().properties.insert(name.clone(), item.clone());
        tracing::debug!(context = %self.options.name, item = %name, "Registered property");
        Ok(item)
    }

    /// 注册模块，模块在 `start()` 的第一阶段被调用
    pub fn register_module(&self, name: impl Into<String>, module: BeanRef) -> Result<(), ContainerError> {
        let name = name.into();
        self.ensure_state(REGISTRATION_STATES)?;
        let bean_types = module.bean_types();
        let item = Arc::new(ConfigurationItem::new(name.clone(), Skeleton::Instance(module)));
        {
            let mut registry = self.registry.lock();
            registry.lifecycle.enroll(&name, &bean_types);
            registry.modules.insert(name.clone(), item);
        }
        tracing::debug!(context = %self.options.name, module = %name, "Registered module");
        Ok(())
    }

    /// 把配置文件中声明的引用、字面值和构造参数应用到已注册的条目上
    pub fn apply_wiring(&self, wiring: &WiringConfig) -> Result<(), ContainerError> {
        self.ensure_state(REGISTRATION_STATES)?;
        for (name, declared) in &wiring.items {
            let item = self
                .registry
                .lock()
                .any(name)
                .ok_or_else(|| ContainerError::missing(name))?;
            for (property, target) in &declared.references {
                item.reference(property.as_str(), target.as_str());
            }
            for (property, value) in &declared.values {
                item.value(property.as_str(), value.clone());
            }
            if let Some(args) = &declared.construct {
                item.construct(args.clone());
            }
            tracing::debug!(context = %self.options.name, item = %name, "Applied declarative wiring");
        }
        Ok(())
    }

    // ---- 解析 ----

    /// 按名称解析条目（先查实例字典，再查配置字典）
    ///
    /// 第一次解析某个名称时，会把属性字典中与 bean 字段同名的值注入进去。
    pub fn get_item(&self, name: &str) -> Result<BeanRef, ContainerError> {
        self.ensure_state(RESOLUTION_STATES)?;
        let item = self
            .registry
            .lock()
            .resolvable(name)
            .ok_or_else(|| ContainerError::missing(name))?;

        let value = self.resolve_tracked(name, &item)?;

        let first_time = self.registry.lock().properties_initialized.insert(name.to_string());
        if first_time {
            self.inject_properties(name, &value)?;
        }
        Ok(value)
    }

    /// 解析并转换为具体类型
    pub fn get<T: Bean>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let bean = self.get_item(name)?;
        downcast::<T>(bean).ok_or_else(|| ContainerError::TypeCastFailed {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    fn inject_properties(&self, name: &str, value: &BeanRef) -> Result<(), ContainerError> {
        for property in value.property_names() {
            let property_item = self.registry.lock().properties.get(*property).cloned();
            if let Some(property_item) = property_item {
                let injected = property_item.resolve(self)?;
                value
                    .set_reference(property, injected)
                    .map_err(|source| ContainerError::Wiring {
                        item: name.to_string(),
                        source,
                    })?;
                tracing::trace!(item = %name, property = %property, "Injected property");
            }
        }
        Ok(())
    }

    /// 解析条目，解析期间名称留在解析栈上
    fn resolve_tracked(&self, name: &str, item: &ConfigurationItem) -> Result<BeanRef, ContainerError> {
        let _guard = self.enter_resolution(name)?;
        item.resolve(self)
    }

    fn enter_resolution(&self, name: &str) -> Result<Option<ResolutionGuard<'_>>, ContainerError> {
        if !self.options.detect_reference_cycles {
            return Ok(None);
        }
        let mut stack = self.resolution_stack.lock();
        if let Some(position) = stack.iter().position(|n| n == name) {
            let mut chain = stack[position..].to_vec();
            chain.push(name.to_string());
            tracing::error!(context = %self.options.name, chain = ?chain, "Circular reference detected");
            return Err(ContainerError::CircularReference { chain });
        }
        stack.push(name.to_string());
        Ok(Some(ResolutionGuard { stack: &self.resolution_stack }))
    }

    /// 生命周期阶段中解析参与者：属性和模块不在 `get_item` 的查找范围内，
    /// 找不到时回退到这两个字典
    fn resolve_participant(&self, name: &str) -> Result<BeanRef, ContainerError> {
        match self.get_item(name) {
            Err(ContainerError::MissingConfiguration { .. }) => {
                let fallback = {
                    let registry = self.registry.lock();
                    registry
                        .properties
                        .get(name)
                        .or_else(|| registry.modules.get(name))
                        .cloned()
                };
                match fallback {
                    Some(item) => self.resolve_tracked(name, &item),
                    None => Err(ContainerError::missing(name)),
                }
            }
            other => other,
        }
    }

    // ---- 生命周期 ----

    /// 启动上下文：模块 -> STARTING -> 能力扫描 -> 初始化 bean -> RUNNING -> 启动 bean
    ///
    /// 任一步骤失败时上下文进入 TERMINATED，错误原样返回，之后不能再使用。
    pub fn start(&self) -> Result<(), ContainerError> {
        self.ensure_state(REGISTRATION_STATES)?;
        let timer = OperationTimer::new("context_start").with_metadata("context", &self.options.name);

        match self.run_start() {
            Ok(()) => {
                timer.finish();
                Ok(())
            }
            Err(e) => {
                tracing::error!(context = %self.options.name, error = %e, "Context failed to start");
                self.set_state(ServiceContextState::Terminated);
                Err(e)
            }
        }
    }

    fn run_start(&self) -> Result<(), ContainerError> {
        // 模块阶段，仍处于 INIT，模块可以继续注册
        let modules = self.registry.lock().lifecycle.modules.clone();
        for name in &modules {
            let item = self.registry.lock().modules.get(name).cloned();
            let Some(item) = item else { continue };
            let module = self.resolve_tracked(name, &item)?;
            if let Some(module) = module.as_module() {
                tracing::debug!(module = %name, "Initializing context from module");
                module
                    .initialize_context(self)
                    .map_err(|source| hook_failure(name, BeanType::Module, source))?;
            }
        }

        self.set_state(ServiceContextState::Starting);

        // 能力扫描：实例、属性、配置依次解析一次，登记生命周期
        let swept: Vec<(String, Arc<ConfigurationItem>)> = {
            let registry = self.registry.lock();
            registry
                .instances
                .iter()
                .chain(registry.properties.iter())
                .chain(registry.configurations.iter())
                .map(|(name, item)| (name.clone(), item.clone()))
                .collect()
        };
        for (name, item) in &swept {
            let value = self.resolve_tracked(name, item)?;
            let bean_types = value.bean_types();
            if !bean_types.is_empty() {
                self.registry.lock().lifecycle.enroll(name, &bean_types);
            }
        }

        let on_init = self.registry.lock().lifecycle.on_init.clone();
        for name in &on_init {
            let bean = self.resolve_participant(name)?;
            if let Some(bean) = bean.as_initializing() {
                tracing::debug!(item = %name, "Calling after_properties_set");
                bean.after_properties_set()
                    .map_err(|source| hook_failure(name, BeanType::Initializing, source))?;
            }
        }

        self.set_state(ServiceContextState::Running);

        let on_started = self.registry.lock().lifecycle.on_started.clone();
        for name in &on_started {
            let bean = self.resolve_participant(name)?;
            if let Some(bean) = bean.as_starting() {
                tracing::debug!(item = %name, "Calling after_started");
                bean.after_started()
                    .map_err(|source| hook_failure(name, BeanType::Starting, source))?;
            }
        }

        Ok(())
    }

    /// 从实例、配置、属性字典中移除名称
    ///
    /// 如果名称登记在销毁列表中，先对已解析的值（尚未解析的现成实例则用实例本身）
    /// 调用 `after_stopped`。
    /// 返回是否有字典真的包含该名称。
    pub fn remove(&self, name: &str) -> Result<bool, ContainerError> {
        self.ensure_state(LIVE_STATES)?;

        let (resolved, disposing) = {
            let registry = self.registry.lock();
            let resolved = registry.any(name).and_then(|item| item.instance_or_cached());
            (resolved, registry.lifecycle.is_disposing(name))
        };

        if disposing {
            if let Some(bean) = resolved.as_ref().and_then(|bean| bean.as_disposing()) {
                tracing::debug!(item = %name, "Calling after_stopped");
                bean.after_stopped()
                    .map_err(|source| hook_failure(name, BeanType::Disposing, source))?;
            }
        }

        let mut registry = self.registry.lock();
        let mut success = false;
        success |= registry.instances.shift_remove(name).is_some();
        success |= registry.configurations.shift_remove(name).is_some();
        success |= registry.properties.shift_remove(name).is_some();
        registry.properties_initialized.remove(name);
        if disposing {
            registry.lifecycle.withdraw_disposing(name);
        }
        Ok(success)
    }

    /// 销毁上下文：依次移除销毁列表中的条目（触发 `after_stopped`），
    /// 然后清空所有字典。若这是进程默认上下文，同时清除默认引用。
    pub fn dispose(&self) -> Result<(), ContainerError> {
        if self.disposing.swap(true, Ordering::SeqCst) {
            return Err(ContainerError::AlreadyDisposing);
        }
        let _guard = DisposingGuard { flag: &self.disposing };
        self.ensure_state(LIVE_STATES)?;

        let timer = OperationTimer::new("context_dispose").with_metadata("context", &self.options.name);
        let on_disposed = self.registry.lock().lifecycle.on_disposed.clone();
        for name in &on_disposed {
            self.remove(name)?;
        }

        self.set_state(ServiceContextState::Disposed);
        *self.registry.lock() = Registry::default();
        self.resolution_stack.lock().clear();
        if self.release_current() {
            tracing::debug!(context = %self.options.name, "Cleared process default context");
        }
        timer.finish();
        Ok(())
    }
}

fn hook_failure(name: &str, phase: BeanType, source: BoxError) -> ContainerError {
    ContainerError::LifecycleHookFailure {
        name: name.to_string(),
        phase,
        source,
    }
}

/// 离开 `get_item` 时弹出解析栈
struct ResolutionGuard<'a> {
    stack: &'a Mutex<Vec<String>>,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.stack.lock().pop();
    }
}

struct DisposingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DisposingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("name", &self.options.name)
            .field("state", &self.current_state())
            .finish()
    }
}
