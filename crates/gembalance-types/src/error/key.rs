//! Key-pool errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during key-pool operations.
///
/// "No usable key" is deliberately NOT an error variant: rotation returns
/// `Option` because pool exhaustion is a normal outcome callers degrade on.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum KeyError {
    /// Key with given ID not found
    #[error("Key not found: {id}")]
    NotFound {
        /// Unique identifier of the missing key
        id: String,
    },

    /// Key storage error (unavailable store, failed transaction)
    #[error("Key storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
    },

    /// Key validation error (e.g., empty secret on insert)
    #[error("Validation error for {field}: {message}")]
    Validation {
        /// Name of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },
}

impl KeyError {
    /// Shorthand for a storage failure.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Check if this is a storage-layer failure (no safe default, must propagate).
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_storage() {
        let storage = KeyError::storage("disk full");
        let not_found = KeyError::NotFound { id: "x".to_string() };

        assert!(storage.is_storage());
        assert!(!not_found.is_storage());
    }
}
