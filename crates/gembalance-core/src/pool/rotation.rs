//! Round-robin key selection.

use gembalance_types::{ApiKey, DayBucket, KeyError};

use super::KeyPool;

// Concurrent advancing callers re-derive the selection after a lost cursor
// CAS; the loop bound turns pathological contention into an error instead of
// a spin.
const CURSOR_RETRY_LIMIT: usize = 16;

impl KeyPool {
    /// Pick the next serviceable key for `model`.
    ///
    /// The scan starts at `cursor mod n` over the keys in creation order and
    /// wraps, skipping keys that carry an error marker or fail the quota
    /// check. `None` means no key can serve right now, which is a normal
    /// outcome and not an error.
    ///
    /// With `advance` the cursor moves to just past the selected position via
    /// compare-and-set, so two racing advancing calls never both act on the
    /// same pre-increment cursor. A peek (`advance = false`) never touches
    /// the cursor.
    pub async fn next_key(&self, model: &str, advance: bool) -> Result<Option<ApiKey>, KeyError> {
        let day = DayBucket::today();
        for _ in 0..CURSOR_RETRY_LIMIT {
            let keys = self.store.list_keys().await?;
            if keys.is_empty() {
                return Ok(None);
            }
            let observed = self.store.cursor().await?;
            let start = (observed % keys.len() as u64) as usize;

            let mut selected = None;
            for offset in 0..keys.len() {
                let idx = (start + offset) % keys.len();
                let key = &keys[idx];
                if key.is_errored() {
                    continue;
                }
                if !self.can_serve(key, model, &day).await? {
                    continue;
                }
                selected = Some(idx);
                break;
            }
            let Some(idx) = selected else {
                return Ok(None);
            };

            if !advance {
                return Ok(Some(keys[idx].clone()));
            }
            let next = ((idx + 1) % keys.len()) as u64;
            if self.store.cas_cursor(observed, next).await? {
                return Ok(Some(keys[idx].clone()));
            }
            tracing::trace!("rotation cursor moved underneath us, rescanning");
        }
        Err(KeyError::storage("rotation cursor contention exceeded retry limit"))
    }
}
