use indexmap::IndexMap;
use serde::Deserialize;

use crate::infrastructure::container::PropertyValue;

/// Declarative wiring for items that are registered in code
///
/// ```toml
/// [items.repository]
/// construct = { pool = 4 }
///
/// [items.repository.references]
/// logger = "log"
///
/// [items.repository.values]
/// table = "users"
/// ```
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WiringConfig {
    #[serde(default)]
    pub items: IndexMap<String, ItemWiring>,
}

/// References, literal values and constructor arguments for one item
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ItemWiring {
    #[serde(default)]
    pub references: IndexMap<String, String>,
    #[serde(default)]
    pub values: IndexMap<String, PropertyValue>,
    #[serde(default)]
    pub construct: Option<PropertyValue>,
}

impl WiringConfig {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
