//! Configuration for the callbridge server
//!
//! Layered settings: an optional TOML file overridden by
//! `CALLBRIDGE_`-prefixed environment variables.

mod settings;

pub use settings::{
    CalendarConfig, EngineConfig, GuardrailConfig, ObservabilityConfig, ServerConfig, Settings,
    StorageConfig, TelephonyConfig,
};

use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
