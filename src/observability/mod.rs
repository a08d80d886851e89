//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (snapshot counters, facade counters/histograms)
//!
//! Consumers:
//!     → stdout
//!     → GET /api/metrics (snapshot counters)
//!     → Prometheus scrape (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through every log line of a request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use metrics::{GatewayMetrics, MetricsSnapshot};
