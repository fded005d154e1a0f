//! 配置条目注入行为的集成测试

use parking_lot::RwLock;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use waspioc::infrastructure::container::{downcast, expect_i64, expect_str, same_bean};
use waspioc::{
    Bean, BeanRef, ContainerError, ContextOptions, PropertyError, PropertyValue, ServiceContext, ServiceContextState,
};

#[derive(Default)]
struct Logger {
    lines: RwLock<Vec<String>>,
}

impl Bean for Logger {}

impl Logger {
    fn log(&self, line: &str) {
        self.lines.write().push(line.to_string());
    }
}

/// 有引用字段和字面值字段的仓储
#[derive(Default)]
struct Repository {
    logger: RwLock<Option<BeanRef>>,
    table: RwLock<String>,
    pool: RwLock<i64>,
    assignments: AtomicUsize,
}

impl Repository {
    fn logger(&self) -> Option<Arc<Logger>> {
        self.logger.read().clone().and_then(downcast::<Logger>)
    }
}

impl Bean for Repository {
    fn property_names(&self) -> &'static [&'static str] {
        &["logger"]
    }

    fn set_reference(&self, property: &str, value: BeanRef) -> Result<(), PropertyError> {
        self.assignments.fetch_add(1, Ordering::SeqCst);
        match property {
            "logger" => {
                *self.logger.write() = Some(value);
                Ok(())
            }
            _ => Err(PropertyError::Unknown(property.to_string())),
        }
    }

    fn set_value(&self, property: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        self.assignments.fetch_add(1, Ordering::SeqCst);
        match property {
            "table" => {
                *self.table.write() = expect_str(property, value)?.to_string();
                Ok(())
            }
            "pool" => {
                let pool = expect_i64(property, value)?;
                if pool <= 0 {
                    return Err(PropertyError::Invalid {
                        property: property.to_string(),
                        reason: "pool size must be positive".to_string(),
                    });
                }
                *self.pool.write() = pool;
                Ok(())
            }
            _ => Err(PropertyError::Unknown(property.to_string())),
        }
    }
}

#[test]
fn test_reference_resolves_target_item() {
    let context = ServiceContext::new();
    context.register_instance("log", Arc::new(Logger::default())).unwrap();
    context
        .register_type::<Repository>("repository")
        .unwrap()
        .reference("logger", "log")
        .value("table", "users")
        .value("pool", 4);
    context.start().unwrap();

    let repository = context.get::<Repository>("repository").unwrap();
    let log = context.get::<Logger>("log").unwrap();
    repository.logger().unwrap().log("ready");

    assert_eq!(*log.lines.read(), vec!["ready"]);
    assert_eq!(*repository.table.read(), "users");
    assert_eq!(*repository.pool.read(), 4);
}

/// 单个字段既可以接收引用也可以接收字面值
enum Slot {
    Empty,
    Reference(BeanRef),
    Literal(PropertyValue),
}

/// 记录每一次写入的目标
struct Target {
    slot: RwLock<Slot>,
    writes: RwLock<Vec<String>>,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            slot: RwLock::new(Slot::Empty),
            writes: RwLock::new(Vec::new()),
        }
    }
}

impl Bean for Target {
    fn set_reference(&self, property: &str, value: BeanRef) -> Result<(), PropertyError> {
        match property {
            "target" => {
                self.writes.write().push(format!("ref:{}", property));
                *self.slot.write() = Slot::Reference(value);
                Ok(())
            }
            _ => Err(PropertyError::Unknown(property.to_string())),
        }
    }

    fn set_value(&self, property: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        match property {
            "target" => {
                self.writes.write().push(format!("val:{}", property));
                *self.slot.write() = Slot::Literal(value.clone());
                Ok(())
            }
            _ => Err(PropertyError::Unknown(property.to_string())),
        }
    }
}

#[test]
fn test_literal_applied_after_reference_wins() {
    let context = ServiceContext::new();
    context.register_type::<Logger>("log").unwrap();
    // 声明顺序与注入顺序无关：先引用后字面值
    context
        .register_type::<Target>("holder")
        .unwrap()
        .value("target", "literal")
        .reference("target", "log");
    context.start().unwrap();

    let holder = context.get::<Target>("holder").unwrap();
    assert_eq!(*holder.writes.read(), vec!["ref:target", "val:target"]);
    match &*holder.slot.read() {
        Slot::Literal(value) => assert_eq!(value, &json!("literal")),
        Slot::Reference(_) => panic!("reference should be overwritten by the literal"),
        Slot::Empty => panic!("slot was never written"),
    };
}

#[test]
fn test_missing_reference_target_fails_start() {
    let context = ServiceContext::new();
    context
        .register_type::<Repository>("repository")
        .unwrap()
        .reference("logger", "ghost");

    let err = context.start().unwrap_err();
    assert!(matches!(err, ContainerError::MissingConfiguration { ref name } if name == "ghost"));
    assert_eq!(context.current_state(), ServiceContextState::Terminated);
}

#[test]
fn test_invalid_literal_is_reported() {
    let context = ServiceContext::new();
    context
        .register_type::<Repository>("repository")
        .unwrap()
        .value("pool", -1);

    match context.start().unwrap_err() {
        ContainerError::Wiring { item, source } => {
            assert_eq!(item, "repository");
            assert!(matches!(source, PropertyError::Invalid { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_wiring_runs_once() {
    let context = ServiceContext::new();
    context.register_type::<Logger>("log").unwrap();
    context
        .register_type::<Repository>("repository")
        .unwrap()
        .reference("logger", "log")
        .value("table", "users");
    context.start().unwrap();

    for _ in 0..10 {
        context.get_item("repository").unwrap();
    }
    let repository = context.get::<Repository>("repository").unwrap();
    assert_eq!(repository.assignments.load(Ordering::SeqCst), 2);
}

#[test]
fn test_property_injection_by_field_name() {
    let context = ServiceContext::new();
    let logger = Arc::new(Logger::default());
    context.register_property("logger", logger.clone()).unwrap();
    context.register_type::<Repository>("repository").unwrap();
    context.start().unwrap();

    let repository = context.get::<Repository>("repository").unwrap();
    let injected = repository.logger.read().clone().unwrap();
    let expected: BeanRef = logger;
    assert!(same_bean(&injected, &expected));
}

#[test]
fn test_property_is_not_resolvable_by_name() {
    let context = ServiceContext::new();
    context.register_property("logger", Arc::new(Logger::default())).unwrap();
    context.start().unwrap();

    assert!(context.is_registered("logger"));
    assert!(matches!(
        context.get_item("logger"),
        Err(ContainerError::MissingConfiguration { .. })
    ));
}

#[test]
fn test_constructor_arguments() {
    let context = ServiceContext::new();
    context
        .register("repository", |args: Option<&PropertyValue>| {
            let repository = Repository::default();
            if let Some(table) = args.and_then(|a| a.get("table")).and_then(|t| t.as_str()) {
                *repository.table.write() = table.to_string();
            }
            Ok(repository)
        })
        .unwrap()
        .construct(json!({ "table": "audit" }));
    context.start().unwrap();

    assert_eq!(*context.get::<Repository>("repository").unwrap().table.read(), "audit");
}

#[test]
fn test_type_cast_failure() {
    let context = ServiceContext::new();
    context.register_type::<Logger>("log").unwrap();
    context.start().unwrap();

    match context.get::<Repository>("log") {
        Err(ContainerError::TypeCastFailed { name, expected }) => {
            assert_eq!(name, "log");
            assert!(expected.ends_with("Repository"));
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_mutual_references_detected_when_enabled() {
    let context = ServiceContext::with_options(ContextOptions::default().with_cycle_detection(true));
    context.register_type::<Repository>("a").unwrap().reference("logger", "b");
    context.register_type::<Repository>("b").unwrap().reference("logger", "c");
    context.register_type::<Repository>("c").unwrap().reference("logger", "a");

    match context.start().unwrap_err() {
        ContainerError::CircularReference { chain } => assert_eq!(chain, vec!["a", "b", "c", "a"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_mutual_references_allowed_by_default() {
    let context = ServiceContext::new();
    context.register_type::<Repository>("a").unwrap().reference("logger", "b");
    context.register_type::<Repository>("b").unwrap().reference("logger", "a");
    context.start().unwrap();

    let a: BeanRef = context.get::<Repository>("a").unwrap();
    let b: BeanRef = context.get::<Repository>("b").unwrap();
    let a_repo = downcast::<Repository>(a.clone()).unwrap();
    let b_repo = downcast::<Repository>(b.clone()).unwrap();
    assert!(same_bean(a_repo.logger.read().as_ref().unwrap(), &b));
    assert!(same_bean(b_repo.logger.read().as_ref().unwrap(), &a));
}

#[test]
fn test_item_accessors() {
    let context = ServiceContext::new();
    let factory_item = context.register_type::<Logger>("log").unwrap();
    let instance_item = context.register_instance("fixed", Arc::new(Logger::default())).unwrap();

    assert_eq!(factory_item.name(), "log");
    assert!(!factory_item.is_instance());
    assert!(instance_item.is_instance());
    assert!(!factory_item.is_initiated());
    assert!(factory_item.cached_value().is_none());

    context.start().unwrap();
    assert!(factory_item.is_initiated());
    assert!(factory_item.cached_value().is_some());
}
