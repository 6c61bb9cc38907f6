//! Error types for configuration loading.
//!
//! Filtering and querying never fail; only building a [`ScatterConfig`] from
//! untrusted input can.
//!
//! [`ScatterConfig`]: crate::config::ScatterConfig

use thiserror::Error;

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed JSON.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A numeric setting is not a positive finite number.
    #[error("invalid {name}: {value} (expected a positive finite number)")]
    NonPositive {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Color is not `#rrggbb`.
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// Fallback domain has an empty or non-finite axis.
    #[error("invalid fallback domain: {0}")]
    InvalidDomain(String),
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
