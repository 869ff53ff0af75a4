//! Batch health checking and single-key verification.
//!
//! Probes feed the quota policy and the health state machine exactly like
//! live traffic: a successful probe records usage and clears any marker, a
//! failed one goes through classification. Timing lives with the caller (the
//! server's scheduler); this module owns none.

use gembalance_types::{ApiKey, DayBucket, KeyError, ModelCategory};
use serde::Serialize;

use super::{FailureKind, KeyPool};
use crate::dispatch::{probe_payload, Dispatcher};

/// Outcome of one probe dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Ok,
    Failed { status: Option<u16>, kind: FailureKind },
}

/// One `(category, model)` probe of one key.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub category: ModelCategory,
    pub model: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

/// All probe results for one key.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub key_id: String,
    pub results: Vec<ProbeResult>,
}

impl ProbeReport {
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|r| matches!(r.outcome, ProbeOutcome::Ok))
    }
}

/// Result of a manual single-key verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub key_id: String,
    pub model: String,
    pub success: bool,
    pub status: Option<u16>,
    /// Present only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<FailureKind>,
}

impl KeyPool {
    /// Probe one key against each target's representative model.
    ///
    /// Errored keys are probed too; success is their recovery path.
    pub async fn probe_key(
        &self,
        dispatcher: &dyn Dispatcher,
        key: &ApiKey,
        targets: &[(ModelCategory, String)],
    ) -> Result<ProbeReport, KeyError> {
        let day = DayBucket::today();
        let payload = probe_payload();
        let mut results = Vec::with_capacity(targets.len());
        for (category, model) in targets {
            let outcome = match dispatcher.generate(key, model, &payload).await {
                Ok(_) => {
                    self.record_usage(&key.id, model, &day).await?;
                    self.clear_failure(&key.id).await?;
                    ProbeOutcome::Ok
                },
                Err(err) => {
                    let kind = self.record_failure(&key.id, err.status(), err.body()).await?;
                    ProbeOutcome::Failed { status: err.status(), kind }
                },
            };
            results.push(ProbeResult { category: *category, model: model.clone(), outcome });
        }
        Ok(ProbeReport { key_id: key.id.clone(), results })
    }

    /// Probe every key in the pool. The scheduler's tick body.
    pub async fn probe_all(
        &self,
        dispatcher: &dyn Dispatcher,
        targets: &[(ModelCategory, String)],
    ) -> Result<Vec<ProbeReport>, KeyError> {
        let keys = self.store.list_keys().await?;
        let mut reports = Vec::with_capacity(keys.len());
        for key in keys {
            reports.push(self.probe_key(dispatcher, &key, targets).await?);
        }
        let failed = reports.iter().filter(|r| !r.all_ok()).count();
        tracing::info!(probed = reports.len(), failed, "pool health sweep finished");
        Ok(reports)
    }

    /// Manually dispatch one model through one key and report the result.
    pub async fn verify_key(
        &self,
        dispatcher: &dyn Dispatcher,
        key_id: &str,
        model: &str,
    ) -> Result<VerifyReport, KeyError> {
        let key = self
            .store
            .get_key(key_id)
            .await?
            .ok_or_else(|| KeyError::NotFound { id: key_id.to_string() })?;

        match dispatcher.generate(&key, model, &probe_payload()).await {
            Ok(response) => {
                self.record_usage(&key.id, model, &DayBucket::today()).await?;
                self.clear_failure(&key.id).await?;
                Ok(VerifyReport {
                    key_id: key.id,
                    model: model.to_string(),
                    success: true,
                    status: Some(response.status),
                    classification: None,
                })
            },
            Err(err) => {
                let kind = self.record_failure(&key.id, err.status(), err.body()).await?;
                Ok(VerifyReport {
                    key_id: key.id,
                    model: model.to_string(),
                    success: false,
                    status: err.status(),
                    classification: Some(kind),
                })
            },
        }
    }
}
