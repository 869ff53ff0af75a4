//! Key health state machine.
//!
//! A key is either clear or carries an [`ErrorMarker`]. Only permanent
//! invalidity is ever recorded: 401/403 unconditionally, and 400 when the
//! upstream's canonical invalid-key message appears in the body. Rate limits,
//! server errors and transport failures leave no trace here; they are the
//! failover orchestrator's problem.

use gembalance_types::{ErrorMarker, ErroredKey, KeyError};
use serde::{Deserialize, Serialize};

use super::KeyPool;

/// Exact upstream message that marks a 400 as permanent key invalidity.
pub const INVALID_KEY_MESSAGE: &str = "API key not valid. Please pass a valid API key.";

/// What a dispatch failure means for the key that made it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The credential itself is bad; the key leaves rotation until cleared.
    InvalidKey,
    /// Anything else. The key stays in rotation.
    Transient,
}

/// Classify a dispatch failure. `status` is `None` for transport errors.
pub fn classify_failure(status: Option<u16>, body: &str) -> FailureKind {
    match status {
        Some(401) | Some(403) => FailureKind::InvalidKey,
        Some(400) if body.contains(INVALID_KEY_MESSAGE) => FailureKind::InvalidKey,
        _ => FailureKind::Transient,
    }
}

impl KeyPool {
    /// Feed one dispatch failure into the state machine.
    ///
    /// Recording is idempotent; a later failure overwrites the marker.
    pub async fn record_failure(
        &self,
        key_id: &str,
        status: Option<u16>,
        body: &str,
    ) -> Result<FailureKind, KeyError> {
        let kind = classify_failure(status, body);
        match kind {
            FailureKind::InvalidKey => {
                // 400-with-phrase arrives with a status; transport errors
                // never classify as invalid, so the unwrap_or is unreachable
                // in practice but keeps the types honest.
                let marker = ErrorMarker::now(status.unwrap_or(400));
                self.store.set_error(key_id, marker).await?;
                tracing::warn!(key_id = %key_id, status = marker.status_code, "key marked invalid");
            },
            FailureKind::Transient => {
                tracing::debug!(key_id = %key_id, ?status, "transient dispatch failure");
            },
        }
        Ok(kind)
    }

    /// Clear a key's marker. Returns whether state actually changed.
    pub async fn clear_failure(&self, key_id: &str) -> Result<bool, KeyError> {
        let changed = self.store.clear_error(key_id).await?;
        if changed {
            tracing::info!(key_id = %key_id, "key error marker cleared");
        }
        Ok(changed)
    }

    /// All currently-marked keys, most recent marking first.
    pub async fn list_errored(&self) -> Result<Vec<ErroredKey>, KeyError> {
        let keys = self.store.list_keys().await?;
        let mut errored: Vec<ErroredKey> = keys
            .into_iter()
            .filter_map(|key| {
                key.error.map(|marker| ErroredKey {
                    id: key.id,
                    name: key.name,
                    status_code: marker.status_code,
                    occurred_at: marker.occurred_at,
                })
            })
            .collect();
        errored.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(errored)
    }

    /// Clear every marker in the pool. Returns the ids that changed.
    pub async fn clear_all_errors(&self) -> Result<Vec<String>, KeyError> {
        let keys = self.store.list_keys().await?;
        let mut cleared = Vec::new();
        for key in keys {
            if key.is_errored() && self.store.clear_error(&key.id).await? {
                cleared.push(key.id);
            }
        }
        if !cleared.is_empty() {
            tracing::info!(count = cleared.len(), "cleared all key error markers");
        }
        Ok(cleared)
    }

    /// Delete every marked key outright. Returns the ids removed.
    pub async fn delete_errored(&self) -> Result<Vec<String>, KeyError> {
        let keys = self.store.list_keys().await?;
        let mut deleted = Vec::new();
        for key in keys {
            if key.is_errored() && self.store.delete_key(&key.id).await? {
                deleted.push(key.id);
            }
        }
        if !deleted.is_empty() {
            tracing::warn!(count = deleted.len(), "deleted errored keys");
        }
        Ok(deleted)
    }
}
