//! Bounded retry-with-failover.

use gembalance_types::{ApiKey, KeyError};
use serde::Serialize;
use std::future::Future;

use super::KeyPool;
use crate::dispatch::{DispatchError, Dispatcher};

pub const DEFAULT_FAILOVER_ATTEMPTS: usize = 3;

const FAILURE_MESSAGE_LIMIT: usize = 200;

/// One failed attempt inside a failover run.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptFailure {
    pub key_id: String,
    /// Upstream status, or `None` for transport failures
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FailoverError {
    /// Every attempt failed, or the pool ran out of serviceable keys.
    #[error("{attempted} failover attempt(s) exhausted without a successful dispatch")]
    Exhausted { attempted: usize, failures: Vec<AttemptFailure> },
    #[error(transparent)]
    Storage(#[from] KeyError),
}

impl KeyPool {
    /// Run `op` against up to `attempts` peek-selected keys until one
    /// succeeds.
    ///
    /// Selection peeks rather than advances, and already-tried keys are not
    /// excluded: after a transient failure the rotation order is unchanged,
    /// so the same key may legitimately be tried again. Each failure is fed
    /// to the health tracker before the next attempt; a key marked invalid
    /// drops out of subsequent scans that way. Pool exhaustion ends the run
    /// immediately.
    ///
    /// Quota accounting stays with the caller; the orchestrator only feeds
    /// the health state machine.
    pub async fn with_failover<T, F, Fut>(
        &self,
        model: &str,
        attempts: usize,
        mut op: F,
    ) -> Result<T, FailoverError>
    where
        F: FnMut(ApiKey) -> Fut,
        Fut: Future<Output = Result<T, DispatchError>>,
    {
        let mut failures = Vec::new();
        for _ in 0..attempts {
            let Some(key) = self.next_key(model, false).await? else {
                break;
            };
            match op(key.clone()).await {
                Ok(value) => {
                    self.clear_failure(&key.id).await?;
                    return Ok(value);
                },
                Err(err) => {
                    self.record_failure(&key.id, err.status(), err.body()).await?;
                    failures.push(AttemptFailure {
                        key_id: key.id,
                        status: err.status(),
                        message: failure_message(&err),
                    });
                },
            }
        }
        tracing::warn!(
            model = %model,
            attempted = failures.len(),
            "failover exhausted without a successful dispatch"
        );
        Err(FailoverError::Exhausted { attempted: failures.len(), failures })
    }

    /// Upstream model listing through failover. `model` only gates which
    /// keys are eligible; listing itself consumes no quota.
    pub async fn list_models(
        &self,
        dispatcher: &dyn Dispatcher,
        model: &str,
        attempts: usize,
    ) -> Result<Vec<String>, FailoverError> {
        self.with_failover(model, attempts, |key| async move {
            dispatcher.list_models(&key).await
        })
        .await
    }
}

fn failure_message(err: &DispatchError) -> String {
    let raw = match err {
        DispatchError::Upstream { body, .. } if !body.is_empty() => body.as_str(),
        other => return other.to_string(),
    };
    let mut message: String = raw.chars().take(FAILURE_MESSAGE_LIMIT).collect();
    if message.len() < raw.len() {
        message.push('…');
    }
    message
}
