//! Configuration management for the order agent
//!
//! Supports loading configuration from:
//! - TOML files
//! - Environment variables (ORDER_AGENT_ prefix)
//! - Serde field defaults (an empty config is fully usable)

pub mod settings;

pub use settings::{
    AddressConfig, ClassifierConfig, DisambiguationConfig, EngineSettings, LinkingConfig,
    MatcherConfig, NluBackendConfig, load_settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
