//! Error types for Palimpsest
//!
//! Tracking itself never fails; errors only come from the edges
//! (configuration files, rule keys parsed from text).

use thiserror::Error;

/// Core error type for Palimpsest operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid rule key: {0:?} (expected \"repository:rule\")")]
    InvalidRuleKey(String),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
