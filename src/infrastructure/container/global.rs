//! 进程默认上下文
//!
//! 第一次访问时创建，销毁后清空，下一次访问会得到一个新的上下文。
//! 插槽本身有锁保护，但上下文按单线程使用设计。

use super::context::ServiceContext;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::sync::Arc;

lazy_static! {
    static ref CURRENT_CONTEXT: Mutex<Option<Arc<ServiceContext>>> = Mutex::new(None);
}

impl ServiceContext {
    /// 返回进程默认上下文，不存在时创建
    pub fn current() -> Arc<ServiceContext> {
        let mut slot = CURRENT_CONTEXT.lock();
        match slot.as_ref() {
            Some(context) => context.clone(),
            None => {
                let context = Arc::new(ServiceContext::new());
                tracing::debug!("Created process default context");
                *slot = Some(context.clone());
                context
            }
        }
    }

    /// 默认上下文是否已经创建（且尚未销毁）
    pub fn has_current() -> bool {
        CURRENT_CONTEXT.lock().is_some()
    }

    /// 如果默认上下文就是 `self`，清空插槽
    pub(crate) fn release_current(&self) -> bool {
        let released = {
            let mut slot = CURRENT_CONTEXT.lock();
            let is_self = slot
                .as_ref()
                .is_some_and(|context| std::ptr::eq(Arc::as_ptr(context), self));
            if is_self {
                slot.take()
            } else {
                None
            }
        };
        // 在锁外释放引用
        released.is_some()
    }
}
