//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client sliding window)
//!     → waf.rs (signature scan of the body)
//!     → memoization stages / origin
//! ```
//!
//! # Design Decisions
//! - Fail closed: a matched signature always rejects
//! - Rate limiting runs first, so floods never reach the scanner

pub mod rate_limit;
pub mod waf;

pub use rate_limit::RateLimiter;
pub use waf::WafInspector;
