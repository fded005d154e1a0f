use serde::Deserialize;
use std::{collections::HashMap, env, fs, path::{Path, PathBuf}};

use crate::errors::ConfigError;

use super::{
    context_config::{ContextOptions, PartialContextOptions},
    wiring_config::{ItemWiring, WiringConfig},
    CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};

/// Fully loaded configuration: context options plus declarative wiring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextConfig {
    pub context: ContextOptions,
    pub wiring: WiringConfig,
}

/// Raw layout of the TOML document
#[derive(Deserialize, Debug, Default)]
struct PartialContextConfig {
    context: Option<PartialContextOptions>,
    #[serde(default)]
    items: indexmap::IndexMap<String, ItemWiring>,
}

/// Configuration loader responsible for reading the context file and environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader that reads `<config dir>/waspioc/context.toml` when it exists
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Loader for an explicit file; a missing file is an error
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// Default location of the context file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration using the process environment for overrides
    pub fn load(&self) -> Result<ContextConfig, ConfigError> {
        let env_map = self.collect_env_vars();
        self.load_with_env(&env_map)
    }

    /// Load configuration with an explicit environment map
    pub fn load_with_env(&self, env_map: &HashMap<String, String>) -> Result<ContextConfig, ConfigError> {
        let partial = match &self.path {
            Some(path) => Some(Self::read_file(path)?),
            None => match Self::default_path() {
                Some(path) if path.exists() => Some(Self::read_file(&path)?),
                _ => {
                    tracing::debug!("No context configuration file found, using defaults");
                    None
                }
            },
        };
        let partial = partial.unwrap_or_default();

        let context = ContextOptions::from_partial_and_env(partial.context, env_map)?;
        Ok(ContextConfig {
            context,
            wiring: WiringConfig { items: partial.items },
        })
    }

    /// Parse a configuration document without environment overrides
    pub fn parse(content: &str, origin: &str) -> Result<ContextConfig, ConfigError> {
        let partial = Self::parse_partial(content, origin)?;
        let context = ContextOptions::from_partial_and_env(partial.context, &HashMap::new())?;
        Ok(ContextConfig {
            context,
            wiring: WiringConfig { items: partial.items },
        })
    }

    fn read_file(path: &Path) -> Result<PartialContextConfig, ConfigError> {
        let origin = path.to_string_lossy().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead(origin.clone(), e))?;
        tracing::info!(path = %origin, "Loading context configuration");
        Self::parse_partial(&content, &origin)
    }

    fn parse_partial(content: &str, origin: &str) -> Result<PartialContextConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlParse(origin.to_string(), e))
    }

    /// Collect the environment variables this crate understands
    fn collect_env_vars(&self) -> HashMap<String, String> {
        env::vars().filter(|(key, _)| key.starts_with("WASPIOC_")).collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
