//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Keep the gateway counters served by the metrics snapshot endpoint
//! - Mirror pipeline events into the `metrics` facade
//! - Optionally expose a Prometheus scrape endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by outcome, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_cache_hits_total` (counter): responses served from cache
//! - `gateway_threats_blocked_total` (counter): rejections by reason
//! - `gateway_idempotent_replays_total` (counter): memoized writes replayed
//! - `gateway_swept_entries_total` (counter): entries reclaimed by sweepers
//!
//! # Design Decisions
//! - Snapshot counters are plain atomics owned by the pipeline, so tests and
//!   the admin surface read them without a recorder installed
//! - Facade calls are no-ops until a recorder is installed

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;

/// Monotonic gateway counters.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    threats_blocked: AtomicU64,
}

/// Point-in-time copy of [`GatewayMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub threats_blocked: u64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_total_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("gateway_cache_hits_total").increment(1);
    }

    pub fn inc_threats_blocked(&self, reason: &'static str) {
        self.threats_blocked.fetch_add(1, Ordering::Relaxed);
        counter!("gateway_threats_blocked_total", "reason" => reason).increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            threats_blocked: self.threats_blocked.load(Ordering::Relaxed),
        }
    }
}

/// Record a finished proxied request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_idempotent_replay() {
    counter!("gateway_idempotent_replays_total").increment(1);
}

pub fn record_swept(store: &'static str, removed: usize) {
    counter!("gateway_swept_entries_total", "store" => store).increment(removed as u64);
}

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = GatewayMetrics::new();
        metrics.inc_total_requests();
        metrics.inc_total_requests();
        metrics.inc_cache_hits();
        metrics.inc_threats_blocked("rate_limited");

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                total_requests: 2,
                cache_hits: 1,
                threats_blocked: 1,
            }
        );
    }

    #[test]
    fn test_snapshot_serializes_with_dashboard_names() {
        let json = serde_json::to_value(GatewayMetrics::new().snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"total_requests": 0, "cache_hits": 0, "threats_blocked": 0})
        );
    }
}
