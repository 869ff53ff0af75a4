//! Pool test suite: shared fixtures plus one file per concern.

mod failover_tests;
mod prober_tests;

use crate::dispatch::{DispatchError, DispatchResponse, Dispatcher};
use crate::pool::KeyPool;
use crate::store::MemoryStore;
use async_trait::async_trait;
use gembalance_types::{ApiKey, QuotaSettings};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fresh in-memory pool with `count` keys named k1..kN in creation order.
async fn pool_with_keys(count: usize) -> (KeyPool, Vec<ApiKey>) {
    let pool = KeyPool::new(Arc::new(MemoryStore::new()), QuotaSettings::default());
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let key = pool
            .add_key(&format!("secret-{i}"), Some(format!("k{}", i + 1)), None)
            .await
            .unwrap();
        keys.push(key);
    }
    (pool, keys)
}

fn ok_response() -> Result<DispatchResponse, DispatchError> {
    Ok(DispatchResponse { status: 200, body: "{}".to_string() })
}

fn upstream_error(status: u16, body: &str) -> Result<DispatchResponse, DispatchError> {
    Err(DispatchError::Upstream { status, body: body.to_string() })
}

/// Dispatcher driven by a fixed script of responses, falling back to a
/// repeating response once the script runs dry. Records which key ids it was
/// handed, in order.
struct ScriptedDispatcher {
    script: Mutex<VecDeque<Result<DispatchResponse, DispatchError>>>,
    fallback: Result<DispatchResponse, DispatchError>,
    models: Vec<String>,
    generate_calls: AtomicUsize,
    keys_seen: Mutex<Vec<String>>,
}

impl ScriptedDispatcher {
    fn always(fallback: Result<DispatchResponse, DispatchError>) -> Self {
        Self::sequence(Vec::new(), fallback)
    }

    fn sequence(
        script: Vec<Result<DispatchResponse, DispatchError>>,
        fallback: Result<DispatchResponse, DispatchError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            models: vec!["gemini-2.5-pro".to_string(), "gemini-2.5-flash".to_string()],
            generate_calls: AtomicUsize::new(0),
            keys_seen: Mutex::new(Vec::new()),
        }
    }

    fn next_scripted(&self) -> Result<DispatchResponse, DispatchError> {
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone())
    }

    fn calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    fn keys_seen(&self) -> Vec<String> {
        self.keys_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for ScriptedDispatcher {
    async fn generate(
        &self,
        key: &ApiKey,
        _model: &str,
        _payload: &serde_json::Value,
    ) -> Result<DispatchResponse, DispatchError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.keys_seen.lock().unwrap().push(key.id.clone());
        self.next_scripted()
    }

    async fn list_models(&self, key: &ApiKey) -> Result<Vec<String>, DispatchError> {
        self.keys_seen.lock().unwrap().push(key.id.clone());
        self.next_scripted().map(|_| self.models.clone())
    }
}
