//! Background expiry of rate-limit windows and idempotency records.
//!
//! Both key spaces otherwise grow with every distinct client and token seen.
//! The response cache is bounded by capacity and is not swept.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::rate_limit::RateLimiter;
use crate::store::idempotency::IdempotencyStore;

/// Something whose stale entries can be dropped in one pass.
pub trait Sweep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the number of entries removed.
    fn sweep(&self) -> usize;
}

impl Sweep for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn sweep(&self) -> usize {
        RateLimiter::sweep(self)
    }
}

impl Sweep for IdempotencyStore {
    fn name(&self) -> &'static str {
        "idempotency"
    }

    fn sweep(&self) -> usize {
        IdempotencyStore::sweep(self)
    }
}

/// Periodically sweeps one store until shutdown.
pub struct Sweeper {
    target: Arc<dyn Sweep>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(target: Arc<dyn Sweep>, interval: Duration) -> Self {
        Self { target, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let name = self.target.name();
        tracing::info!(store = name, interval = ?self.interval, "Sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; nothing is stale yet
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.target.sweep();
                    if removed > 0 {
                        tracing::debug!(store = name, removed, "Swept stale entries");
                    }
                    metrics::record_swept(name, removed);
                }
                _ = shutdown.recv() => {
                    tracing::info!(store = name, "Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
