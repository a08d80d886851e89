//! Per-client sliding-window rate limiting.
//!
//! Each client owns an ordered list of the instants at which it was admitted
//! during the trailing window. A check prunes instants that fell out of the
//! window, denies when the remaining count has reached the threshold, and
//! otherwise records the current instant.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::clock::SharedClock;
use crate::config::RateLimitConfig;

/// Admission timestamps for one client, oldest first.
#[derive(Debug, Default)]
struct ClientWindow {
    hits: VecDeque<Instant>,
}

impl ClientWindow {
    /// Drop every instant that is `window` or more behind `now`.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.hits.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Sliding-window limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, ClientWindow>,
    window: Duration,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::from_secs(config.window_secs),
            clock,
        }
    }

    /// Returns true if `client` is admitted under `threshold`.
    ///
    /// The threshold is passed on every call so a settings change applies to
    /// the very next request. A denied request is not recorded.
    pub fn admit(&self, client: &str, threshold: u32) -> bool {
        let now = self.clock.now();

        // The entry guard holds the shard lock, so prune/check/append is
        // atomic for this client.
        let mut entry = self.windows.entry(client.to_string()).or_default();
        entry.prune(now, self.window);

        if entry.hits.len() >= threshold as usize {
            return false;
        }

        entry.hits.push_back(now);
        true
    }

    /// Remove clients whose window has fully expired. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, w| {
            w.prune(now, self.window);
            !w.hits.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}
