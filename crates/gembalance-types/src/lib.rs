//! # Gembalance Types
//!
//! Core types, models, and error definitions for Gembalance.
//!
//! This crate provides the foundational type system for the Gembalance ecosystem:
//!
//! - **`error`** - Typed error hierarchy for keys and configuration
//! - **`models`** - Domain models (`ApiKey`, `ModelCategory`, quota settings, day buckets)
//!
//! ## Architecture Role
//!
//! `gembalance-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!     gembalance-types (this crate)
//!             │
//!             ▼
//!      gembalance-core
//!             │
//!             ▼
//!     gembalance-server
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for API responses
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, KeyError, Result, TypedError};

// Re-export core model types
pub use models::{
    ApiKey, CategoryQuotas, DayBucket, ErrorMarker, ErroredKey, KeyUsage, ModelCategory,
    ModelConfig, QuotaSettings,
};
