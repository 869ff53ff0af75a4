//! Day-bucketed usage accounting types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A UTC calendar day used to bucket usage counters.
///
/// Daily "reset" is implicit: counters are keyed by bucket, and buckets for
/// past days are simply never read for the current day. No sweeper exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayBucket(String);

impl DayBucket {
    /// Bucket for the current UTC day.
    pub fn today() -> Self {
        Self(chrono::Utc::now().format("%Y-%m-%d").to_string())
    }

    /// Bucket from an explicit date, mainly for tests simulating rollover.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        Self(format!("{year:04}-{month:02}-{day:02}"))
    }

    /// Storage key fragment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DayBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-key usage snapshot for the admin listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyUsage {
    /// Calls per model for the reported day
    #[serde(default)]
    pub models: HashMap<String, u64>,
    /// Calls per category for the reported day
    #[serde(default)]
    pub categories: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_days_are_distinct_buckets() {
        let d1 = DayBucket::from_ymd(2026, 8, 24);
        let d2 = DayBucket::from_ymd(2026, 8, 25);
        assert_ne!(d1, d2);
        assert!(d1 < d2);
    }

    #[test]
    fn test_today_is_iso_formatted() {
        let today = DayBucket::today();
        assert_eq!(today.as_str().len(), 10);
        assert_eq!(today.as_str().matches('-').count(), 2);
    }
}
