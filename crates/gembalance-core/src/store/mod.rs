//! Durable key storage.
//!
//! The pool core only needs a handful of primitives from its store: ordered
//! enumeration, point lookup, atomic counter increment, an atomic error-marker
//! transition, and compare-and-set on the rotation cursor. Everything else
//! (scan logic, classification, quota math) lives above the store so that the
//! two implementations stay small.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use gembalance_types::{ApiKey, DayBucket, ErrorMarker, KeyError, KeyUsage, ModelCategory};

/// Counter dimension for per-model usage.
pub fn model_dimension(model: &str) -> String {
    format!("m:{model}")
}

/// Counter dimension for per-category usage.
pub fn category_dimension(category: ModelCategory) -> String {
    format!("c:{}", category.as_str())
}

/// Storage collaborator for the key pool.
///
/// Implementations must make `increment_usage` atomic per counter and
/// `cas_cursor` linearizable: of two racing advancements from the same
/// observed value, exactly one succeeds.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Insert a new key. Fails validation if the id already exists.
    async fn insert_key(&self, key: &ApiKey) -> Result<(), KeyError>;

    /// Remove a key entirely. Returns whether it existed.
    async fn delete_key(&self, id: &str) -> Result<bool, KeyError>;

    /// Point lookup by id.
    async fn get_key(&self, id: &str) -> Result<Option<ApiKey>, KeyError>;

    /// All keys in creation order. This order is what the rotation cursor
    /// indexes into, so it must be stable across calls.
    async fn list_keys(&self) -> Result<Vec<ApiKey>, KeyError>;

    /// Atomically add one to the `(key, dimension, day)` counter.
    async fn increment_usage(
        &self,
        key_id: &str,
        dimension: &str,
        day: &DayBucket,
    ) -> Result<(), KeyError>;

    /// One key's count for a dimension on a day. Missing counters read zero.
    async fn usage(&self, key_id: &str, dimension: &str, day: &DayBucket)
        -> Result<u64, KeyError>;

    /// Sum of a dimension's counters across all keys for a day.
    async fn dimension_total(&self, dimension: &str, day: &DayBucket) -> Result<u64, KeyError>;

    /// All of one key's counters for a day, split back into models and
    /// categories for the admin listing.
    async fn usage_snapshot(&self, key_id: &str, day: &DayBucket) -> Result<KeyUsage, KeyError>;

    /// Overwrite the key's error marker.
    async fn set_error(&self, key_id: &str, marker: ErrorMarker) -> Result<(), KeyError>;

    /// Clear the key's error marker. Returns whether state actually changed.
    async fn clear_error(&self, key_id: &str) -> Result<bool, KeyError>;

    /// Current rotation cursor value.
    async fn cursor(&self) -> Result<u64, KeyError>;

    /// Compare-and-set the rotation cursor. Returns false when another
    /// advancement won the race.
    async fn cas_cursor(&self, expected: u64, next: u64) -> Result<bool, KeyError>;
}

/// Split a raw dimension back into the snapshot's model/category maps.
pub(crate) fn fold_dimension(snapshot: &mut KeyUsage, dimension: &str, count: u64) {
    if let Some(model) = dimension.strip_prefix("m:") {
        snapshot.models.insert(model.to_string(), count);
    } else if let Some(category) = dimension.strip_prefix("c:") {
        snapshot.categories.insert(category.to_string(), count);
    }
}
