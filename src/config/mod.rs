pub mod context_config;
pub mod loader;
pub mod wiring_config;

// Re-export commonly used types
pub use context_config::ContextOptions;
pub use loader::{ConfigLoader, ContextConfig};
pub use wiring_config::{ItemWiring, WiringConfig};

// Configuration location constants
pub const CONFIG_DIR_NAME: &str = "waspioc";
pub const CONFIG_FILE_NAME: &str = "context.toml";
