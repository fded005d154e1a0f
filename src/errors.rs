use crate::infrastructure::container::{BeanType, ServiceContextState};
use thiserror::Error;

/// 生命周期钩子和工厂返回的底层错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 服务上下文错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 在不允许的状态下调用了操作
    #[error("Wrong context state: expected one of {}, found {actual}", format_states(.expected))]
    WrongState {
        expected: Vec<ServiceContextState>,
        actual: ServiceContextState,
    },
    /// 实例字典和配置字典中都找不到该名称
    #[error("No configuration found with name \"{name}\"")]
    MissingConfiguration { name: String },
    /// 上一次 dispose 还没有结束
    #[error("Context is already being disposed")]
    AlreadyDisposing,
    /// 生命周期钩子执行失败
    #[error("{phase:?} hook of '{name}' failed: {source}")]
    LifecycleHookFailure {
        name: String,
        phase: BeanType,
        #[source]
        source: BoxError,
    },
    /// 工厂创建实例失败
    #[error("Failed to create '{name}': {source}")]
    CreationFailed {
        name: String,
        #[source]
        source: BoxError,
    },
    /// 引用或字面值注入失败
    #[error("Failed to wire '{item}': {source}")]
    Wiring {
        item: String,
        #[source]
        source: PropertyError,
    },
    /// 解析结果不是期望的类型
    #[error("Type cast failed for '{name}': expected {expected}")]
    TypeCastFailed { name: String, expected: &'static str },
    /// 引用链出现环
    #[error("Circular reference detected: {}", .chain.join(" -> "))]
    CircularReference { chain: Vec<String> },
}

impl ContainerError {
    pub(crate) fn wrong_state(expected: &[ServiceContextState], actual: ServiceContextState) -> Self {
        ContainerError::WrongState {
            expected: expected.to_vec(),
            actual,
        }
    }

    pub(crate) fn missing(name: &str) -> Self {
        ContainerError::MissingConfiguration {
            name: name.to_string(),
        }
    }
}

fn format_states(states: &[ServiceContextState]) -> String {
    let names: Vec<String> = states.iter().map(|s| s.to_string()).collect();
    format!("[{}]", names.join(", "))
}

/// Bean 字段赋值错误，由 `Bean::set_reference` / `Bean::set_value` 返回
#[derive(Debug, Error, PartialEq)]
pub enum PropertyError {
    #[error("unknown property '{0}'")]
    Unknown(String),
    #[error("property '{property}' expects {expected}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
    },
    #[error("invalid value for '{property}': {reason}")]
    Invalid { property: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for environment variable {0}: '{1}'")]
    InvalidEnv(String, String),
}
