//! Configuration errors.
//!
//! Configuration problems surface synchronously to the admin layer as
//! validation failures; they are never silently coerced.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or updating configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Quota value out of range (must be positive when set)
    #[error("Invalid quota for {field}: {value}")]
    InvalidQuota {
        /// Name of the quota setting
        field: String,
        /// The rejected value
        value: i64,
    },

    /// Unknown model category name
    #[error("Unknown category: {name}")]
    UnknownCategory {
        /// The rejected category name
        name: String,
    },

    /// Config file could not be read or written
    #[error("Config I/O error: {message}")]
    Io {
        /// Description of the I/O failure
        message: String,
    },

    /// Config file could not be parsed
    #[error("Config parse error: {message}")]
    Parse {
        /// Description of the parse failure
        message: String,
    },
}
