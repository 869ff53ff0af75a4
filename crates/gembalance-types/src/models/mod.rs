//! Domain models for the key pool.

mod category;
mod key;
mod usage;

pub use category::{CategoryQuotas, ModelCategory, ModelConfig, QuotaSettings};
pub use key::{ApiKey, ErrorMarker, ErroredKey};
pub use usage::{DayBucket, KeyUsage};
