//! 上下文状态和生命周期列表

use super::bean::BeanType;
use std::fmt;

/// 服务上下文状态
///
/// INIT: 可以注册条目
/// STARTING: 模块已经执行，初始化 bean 正在被调用，可以解析条目
/// RUNNING: 初始化 bean 全部完成，启动 bean 已经或正在被调用
/// DISPOSED: 上下文已销毁，不再持有任何条目
/// TERMINATED: 启动过程中发生错误，上下文被强制停止
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceContextState {
    Init,
    Starting,
    Running,
    Disposed,
    Terminated,
}

impl fmt::Display for ServiceContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceContextState::Init => "INIT",
            ServiceContextState::Starting => "STARTING",
            ServiceContextState::Running => "RUNNING",
            ServiceContextState::Disposed => "DISPOSED",
            ServiceContextState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// 各生命周期阶段需要回调的条目名称，按登记顺序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifeCycle {
    pub modules: Vec<String>,
    pub on_init: Vec<String>,
    pub on_started: Vec<String>,
    pub on_disposed: Vec<String>,
}

impl LifeCycle {
    /// 按 bean 声明的类型登记名称，同一列表中不重复登记
    pub fn enroll(&mut self, name: &str, bean_types: &[BeanType]) {
        for bean_type in bean_types {
            let list = self.list_mut(*bean_type);
            if !list.iter().any(|n| n == name) {
                list.push(name.to_string());
            }
        }
    }

    pub fn list(&self, bean_type: BeanType) -> &[String] {
        match bean_type {
            BeanType::Module => &self.modules,
            BeanType::Initializing => &self.on_init,
            BeanType::Starting => &self.on_started,
            BeanType::Disposing => &self.on_disposed,
        }
    }

    fn list_mut(&mut self, bean_type: BeanType) -> &mut Vec<String> {
        match bean_type {
            BeanType::Module => &mut self.modules,
            BeanType::Initializing => &mut self.on_init,
            BeanType::Starting => &mut self.on_started,
            BeanType::Disposing => &mut self.on_disposed,
        }
    }

    /// 从销毁列表中移除名称，返回是否存在
    pub fn withdraw_disposing(&mut self, name: &str) -> bool {
        match self.on_disposed.iter().position(|n| n == name) {
            Some(index) => {
                self.on_disposed.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_disposing(&self, name: &str) -> bool {
        self.on_disposed.iter().any(|n| n == name)
    }
}
