//! The key pool.
//!
//! [`KeyPool`] is the single entry point for everything that touches keys:
//! admin CRUD, rotation, quota accounting, health transitions, failover and
//! probing. Each concern lives in its own submodule as `impl KeyPool` blocks;
//! the struct itself only holds the store handle and the quota settings.

mod failover;
mod health;
mod prober;
mod quota;
mod rotation;

#[cfg(test)]
mod tests;

pub use failover::{AttemptFailure, FailoverError, DEFAULT_FAILOVER_ATTEMPTS};
pub use health::{classify_failure, FailureKind, INVALID_KEY_MESSAGE};
pub use prober::{ProbeOutcome, ProbeReport, ProbeResult, VerifyReport};

use crate::store::KeyStore;
use gembalance_types::{
    ApiKey, CategoryQuotas, DayBucket, ErrorMarker, KeyError, KeyUsage, ModelConfig, QuotaSettings,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct KeyPool {
    store: Arc<dyn KeyStore>,
    settings: RwLock<QuotaSettings>,
}

/// One key in the admin listing: everything except the secret, plus the
/// day's usage.
#[derive(Debug, Clone, Serialize)]
pub struct KeySummary {
    pub id: String,
    pub name: Option<String>,
    pub daily_quota: Option<u64>,
    pub error: Option<ErrorMarker>,
    pub created_at: i64,
    pub usage: KeyUsage,
}

impl KeyPool {
    pub fn new(store: Arc<dyn KeyStore>, settings: QuotaSettings) -> Self {
        Self { store, settings: RwLock::new(settings) }
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Add one key. The secret is trimmed and must be non-empty.
    pub async fn add_key(
        &self,
        secret: &str,
        name: Option<String>,
        daily_quota: Option<u64>,
    ) -> Result<ApiKey, KeyError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(KeyError::Validation {
                field: "secret".to_string(),
                message: "secret must not be empty".to_string(),
            });
        }
        let mut key = ApiKey::new(secret, name);
        key.daily_quota = daily_quota;
        self.store.insert_key(&key).await?;
        tracing::info!(key_id = %key.id, "key added to pool");
        Ok(key)
    }

    /// Remove a key and its usage counters. Returns whether it existed.
    pub async fn delete_key(&self, id: &str) -> Result<bool, KeyError> {
        let removed = self.store.delete_key(id).await?;
        if removed {
            tracing::info!(key_id = %id, "key removed from pool");
        }
        Ok(removed)
    }

    pub async fn get_key(&self, id: &str) -> Result<Option<ApiKey>, KeyError> {
        self.store.get_key(id).await
    }

    /// Admin listing: every key with its usage for `day`, secrets omitted.
    pub async fn summaries(&self, day: &DayBucket) -> Result<Vec<KeySummary>, KeyError> {
        let keys = self.store.list_keys().await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let usage = self.store.usage_snapshot(&key.id, day).await?;
            out.push(KeySummary {
                id: key.id,
                name: key.name,
                daily_quota: key.daily_quota,
                error: key.error,
                created_at: key.created_at,
                usage,
            });
        }
        Ok(out)
    }

    pub async fn settings(&self) -> QuotaSettings {
        self.settings.read().await.clone()
    }

    pub async fn set_model_configs(&self, models: HashMap<String, ModelConfig>) {
        self.settings.write().await.models = models;
    }

    pub async fn set_category_quotas(&self, categories: CategoryQuotas) {
        self.settings.write().await.categories = categories;
    }
}
