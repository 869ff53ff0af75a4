//! # Gembalance Core
//!
//! The key pool & quota manager: selects which upstream credential serves an
//! outbound call, tracks day-bucketed usage against per-key and per-category
//! quotas, owns the key health state machine, and orchestrates bounded
//! retry-with-failover for best-effort operations.
//!
//! Modules:
//! - **`store`** - `KeyStore` trait plus SQLite and in-memory implementations
//! - **`pool`** - rotation, quota policy, health tracking, failover, probing
//! - **`dispatch`** - outbound dispatcher interface and reqwest implementation

pub mod dispatch;
pub mod pool;
pub mod store;

pub use dispatch::{DispatchError, DispatchResponse, Dispatcher, HttpDispatcher};
pub use pool::{
    classify_failure, AttemptFailure, FailoverError, FailureKind, KeyPool, KeySummary,
    ProbeOutcome, ProbeReport, ProbeResult, VerifyReport, DEFAULT_FAILOVER_ATTEMPTS,
    INVALID_KEY_MESSAGE,
};
pub use store::{KeyStore, MemoryStore, SqliteStore};
