//! 进程默认上下文
//!
//! 默认上下文是进程级状态，这里只放一个测试函数，避免与并行测试互相干扰。

use std::sync::Arc;
use waspioc::{Bean, ServiceContext, ServiceContextState};

#[derive(Default)]
struct Plain;

impl Bean for Plain {}

#[test]
fn test_default_context_lifecycle() {
    assert!(!ServiceContext::has_current());

    let first = ServiceContext::current();
    assert!(ServiceContext::has_current());
    assert!(Arc::ptr_eq(&first, &ServiceContext::current()));

    first.register_type::<Plain>("plain").unwrap();
    first.start().unwrap();
    assert!(ServiceContext::current().get::<Plain>("plain").is_ok());

    // 销毁其他上下文不影响默认上下文
    let other = ServiceContext::new();
    other.dispose().unwrap();
    assert!(ServiceContext::has_current());

    first.dispose().unwrap();
    assert!(!ServiceContext::has_current());
    assert_eq!(first.current_state(), ServiceContextState::Disposed);

    let second = ServiceContext::current();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.current_state(), ServiceContextState::Init);
}
