//! Upstream credential key model and its health marker.

use serde::{Deserialize, Serialize};

/// An upstream credential managed by the pool.
///
/// Usage counters and the error marker are mutated only through the quota
/// policy and health tracker respectively, never directly by callers.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey {
    /// Opaque stable identifier, assigned at creation
    pub id: String,
    /// Secret credential material. Never logged.
    pub secret: String,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Per-key daily quota override; takes precedence over the model's
    /// configured individual quota. `None` falls through to model config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_quota: Option<u64>,
    /// Recorded invalidity marker, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMarker>,
    /// Timestamp when the key was added to the pool
    pub created_at: i64,
}

impl ApiKey {
    /// Create a new key with a fresh UUID.
    pub fn new(secret: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            secret: secret.into(),
            name,
            daily_quota: None,
            error: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Whether the key currently carries a recorded invalidity marker.
    pub const fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}

// Manual Debug so the secret can never leak into logs.
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("name", &self.name)
            .field("daily_quota", &self.daily_quota)
            .field("error", &self.error)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Recorded invalidity state of a key.
///
/// Recording is idempotent: a second record simply overwrites the previous
/// one. Clearing a clear key is a no-op that reports "no change".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorMarker {
    /// HTTP-style status code that caused the marking
    pub status_code: u16,
    /// Unix timestamp of the marking
    pub occurred_at: i64,
}

impl ErrorMarker {
    /// Marker for a failure observed now.
    pub fn now(status_code: u16) -> Self {
        Self { status_code, occurred_at: chrono::Utc::now().timestamp() }
    }
}

/// Summary row for the errored-keys listing, ordered by recency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErroredKey {
    /// Key identifier
    pub id: String,
    /// Optional display name
    pub name: Option<String>,
    /// Status code that caused the marking
    pub status_code: u16,
    /// Unix timestamp of the marking
    pub occurred_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_secret() {
        let key = ApiKey::new("AIza-super-secret", Some("primary".to_string()));
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("AIza-super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_new_key_is_clear() {
        let key = ApiKey::new("s", None);
        assert!(!key.is_errored());
        assert!(!key.id.is_empty());
    }
}
