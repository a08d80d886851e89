//! Memoization stores.
//!
//! # Data Flow
//! ```text
//! GET  → response_cache.rs (fingerprint → response, TTL + capacity bound)
//! POST → idempotency.rs    (token hash  → response, TTL, per-token lock)
//!
//! Background:
//!     sweeper.rs → idempotency records and rate-limit windows
//! ```
//!
//! # Design Decisions
//! - Expiry is lazy on read; sweeping only reclaims memory
//! - Only origin responses are stored, never gateway errors

pub mod idempotency;
pub mod response_cache;
pub mod sweeper;

pub use idempotency::IdempotencyStore;
pub use response_cache::ResponseCache;
pub use sweeper::{Sweep, Sweeper};
