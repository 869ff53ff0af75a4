//! In-memory key store.
//!
//! Used by tests and zero-setup runs. Counter and cursor atomicity come from
//! DashMap entry operations and an atomic integer; the key list itself sits
//! behind a std RwLock (never held across an await).

use async_trait::async_trait;
use dashmap::DashMap;
use gembalance_types::{ApiKey, DayBucket, ErrorMarker, KeyError, KeyUsage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::{fold_dimension, KeyStore};

#[derive(Default)]
pub struct MemoryStore {
    keys: RwLock<Vec<ApiKey>>,
    counters: DashMap<(String, String, String), u64>,
    cursor: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> KeyError {
        KeyError::storage("key list lock poisoned")
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn insert_key(&self, key: &ApiKey) -> Result<(), KeyError> {
        let mut keys = self.keys.write().map_err(|_| Self::lock_poisoned())?;
        if keys.iter().any(|k| k.id == key.id) {
            return Err(KeyError::Validation {
                field: "id".to_string(),
                message: format!("duplicate key id: {}", key.id),
            });
        }
        keys.push(key.clone());
        Ok(())
    }

    async fn delete_key(&self, id: &str) -> Result<bool, KeyError> {
        let mut keys = self.keys.write().map_err(|_| Self::lock_poisoned())?;
        let before = keys.len();
        keys.retain(|k| k.id != id);
        let removed = keys.len() != before;
        if removed {
            self.counters.retain(|(key_id, _, _), _| key_id != id);
        }
        Ok(removed)
    }

    async fn get_key(&self, id: &str) -> Result<Option<ApiKey>, KeyError> {
        let keys = self.keys.read().map_err(|_| Self::lock_poisoned())?;
        Ok(keys.iter().find(|k| k.id == id).cloned())
    }

    async fn list_keys(&self) -> Result<Vec<ApiKey>, KeyError> {
        let keys = self.keys.read().map_err(|_| Self::lock_poisoned())?;
        Ok(keys.clone())
    }

    async fn increment_usage(
        &self,
        key_id: &str,
        dimension: &str,
        day: &DayBucket,
    ) -> Result<(), KeyError> {
        let counter_key = (key_id.to_string(), dimension.to_string(), day.as_str().to_string());
        *self.counters.entry(counter_key).or_insert(0) += 1;
        Ok(())
    }

    async fn usage(
        &self,
        key_id: &str,
        dimension: &str,
        day: &DayBucket,
    ) -> Result<u64, KeyError> {
        let counter_key = (key_id.to_string(), dimension.to_string(), day.as_str().to_string());
        Ok(self.counters.get(&counter_key).map(|v| *v).unwrap_or(0))
    }

    async fn dimension_total(&self, dimension: &str, day: &DayBucket) -> Result<u64, KeyError> {
        let total = self
            .counters
            .iter()
            .filter(|entry| entry.key().1 == dimension && entry.key().2 == day.as_str())
            .map(|entry| *entry.value())
            .sum();
        Ok(total)
    }

    async fn usage_snapshot(&self, key_id: &str, day: &DayBucket) -> Result<KeyUsage, KeyError> {
        let mut snapshot = KeyUsage::default();
        for entry in self.counters.iter() {
            let (owner, dimension, bucket) = entry.key();
            if owner == key_id && bucket == day.as_str() {
                fold_dimension(&mut snapshot, dimension, *entry.value());
            }
        }
        Ok(snapshot)
    }

    async fn set_error(&self, key_id: &str, marker: ErrorMarker) -> Result<(), KeyError> {
        let mut keys = self.keys.write().map_err(|_| Self::lock_poisoned())?;
        let key = keys
            .iter_mut()
            .find(|k| k.id == key_id)
            .ok_or_else(|| KeyError::NotFound { id: key_id.to_string() })?;
        key.error = Some(marker);
        Ok(())
    }

    async fn clear_error(&self, key_id: &str) -> Result<bool, KeyError> {
        let mut keys = self.keys.write().map_err(|_| Self::lock_poisoned())?;
        let key = keys
            .iter_mut()
            .find(|k| k.id == key_id)
            .ok_or_else(|| KeyError::NotFound { id: key_id.to_string() })?;
        Ok(key.error.take().is_some())
    }

    async fn cursor(&self) -> Result<u64, KeyError> {
        Ok(self.cursor.load(Ordering::SeqCst))
    }

    async fn cas_cursor(&self, expected: u64, next: u64) -> Result<bool, KeyError> {
        Ok(self
            .cursor
            .compare_exchange(expected, next, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }
}
