//! Two-level quota policy.
//!
//! Checks are advisory: a `can_serve` racing another call's `record_usage`
//! may admit one request past the cap. The counters are monotone within a
//! day bucket, so the overshoot is bounded by the number of in-flight calls.

use gembalance_types::{ApiKey, DayBucket, KeyError};

use super::KeyPool;
use crate::store::{category_dimension, model_dimension};

impl KeyPool {
    /// Whether `key` may serve one more call for `model` on `day`.
    ///
    /// Order of checks: category aggregate cap first (it gates the whole
    /// pool), then the per-key cap. The per-key cap resolves as key override,
    /// else the model's configured quota, else unlimited. Unset caps pass.
    pub async fn can_serve(
        &self,
        key: &ApiKey,
        model: &str,
        day: &DayBucket,
    ) -> Result<bool, KeyError> {
        let settings = self.settings.read().await;
        let category = settings.category_of(model);

        if let Some(cap) = settings.categories.cap_for(category) {
            let total = self.store.dimension_total(&category_dimension(category), day).await?;
            if total >= cap {
                return Ok(false);
            }
        }

        let key_cap = key.daily_quota.or_else(|| settings.model_quota(model));
        if let Some(cap) = key_cap {
            let used = self.store.usage(&key.id, &model_dimension(model), day).await?;
            if used >= cap {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Record one successful call: bumps the key's per-model counter and the
    /// pool-wide category counter for the model's resolved category.
    ///
    /// Callers invoke this only after a confirmed upstream success.
    pub async fn record_usage(
        &self,
        key_id: &str,
        model: &str,
        day: &DayBucket,
    ) -> Result<(), KeyError> {
        let category = self.settings.read().await.category_of(model);
        self.store.increment_usage(key_id, &model_dimension(model), day).await?;
        self.store.increment_usage(key_id, &category_dimension(category), day).await?;
        Ok(())
    }
}
