//! Request-processing pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest + settings snapshot
//!     → stage.rs (RequestKeys: fingerprint / token hash)
//!     → stages.rs (rate_limit, waf | idempotency, cache)
//!     → orchestrator.rs (short-circuit, forward, store, counters)
//! ```
//!
//! # Design Decisions
//! - Stages are pure decisions over (request, settings, keys); side effects
//!   live in the orchestrator
//! - Cheapest rejection first; content inspection before any memoized answer

pub mod orchestrator;
pub mod stage;
pub mod stages;

pub use orchestrator::{Outcome, Pipeline};
pub use stage::{Replay, RequestKeys, Stage, StageContext, Verdict};
