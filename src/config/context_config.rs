use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ConfigError;

pub const ENV_CONTEXT_NAME: &str = "WASPIOC_CONTEXT_NAME";
pub const ENV_DETECT_CYCLES: &str = "WASPIOC_DETECT_CYCLES";

/// Options for a single service context
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// Name used in log output
    #[serde(default = "default_name")]
    pub name: String,

    /// Fail fast with `CircularReference` when a reference chain loops back
    /// onto an item that is still being resolved. Off by default: a re-entrant
    /// request then receives the cached, partially wired value
    #[serde(default = "default_detect_reference_cycles")]
    pub detect_reference_cycles: bool,
}

/// Partial context options as read from a configuration file
#[derive(Deserialize, Debug, Default)]
pub struct PartialContextOptions {
    pub name: Option<String>,
    pub detect_reference_cycles: Option<bool>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
            detect_reference_cycles: default_detect_reference_cycles(),
        }
    }
}

impl ContextOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.detect_reference_cycles = enabled;
        self
    }

    /// Merge file values with environment overrides, environment wins
    pub fn from_partial_and_env(
        partial: Option<PartialContextOptions>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let name = env_map
            .get(ENV_CONTEXT_NAME)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .or(partial.name)
            .unwrap_or_else(default_name);

        let detect_reference_cycles = match env_map.get(ENV_DETECT_CYCLES) {
            Some(raw) => parse_bool(ENV_DETECT_CYCLES, raw)?,
            None => partial
                .detect_reference_cycles
                .unwrap_or_else(default_detect_reference_cycles),
        };

        Ok(Self {
            name,
            detect_reference_cycles,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv(key.to_string(), raw.to_string())),
    }
}

// Default functions
fn default_name() -> String {
    "default".to_string()
}

fn default_detect_reference_cycles() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ContextOptions::default();
        assert_eq!(options.name, "default");
        assert!(!options.detect_reference_cycles);
    }

    #[test]
    fn test_partial_values_are_kept_without_env() {
        let partial = PartialContextOptions {
            name: Some("app".to_string()),
            detect_reference_cycles: Some(false),
        };
        let options = ContextOptions::from_partial_and_env(Some(partial), &HashMap::new()).unwrap();
        assert_eq!(options, ContextOptions::named("app").with_cycle_detection(false));
    }

    #[test]
    fn test_env_overrides_file() {
        let partial = PartialContextOptions {
            name: Some("app".to_string()),
            detect_reference_cycles: Some(false),
        };
        let mut env = HashMap::new();
        env.insert(ENV_CONTEXT_NAME.to_string(), "worker".to_string());
        env.insert(ENV_DETECT_CYCLES.to_string(), "on".to_string());

        let options = ContextOptions::from_partial_and_env(Some(partial), &env).unwrap();
        assert_eq!(options.name, "worker");
        assert!(options.detect_reference_cycles);
    }

    #[test]
    fn test_invalid_env_flag() {
        let mut env = HashMap::new();
        env.insert(ENV_DETECT_CYCLES.to_string(), "sometimes".to_string());

        let err = ContextOptions::from_partial_and_env(None, &env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv(ref key, _) if key == ENV_DETECT_CYCLES));
    }
}
