//! Write-idempotency store.
//!
//! Memoizes the origin response of a write by a hash of the client-supplied
//! token. A record is a hit only while it is younger than the TTL; stale
//! records are ignored on read and removed by [`IdempotencyStore::sweep`].
//!
//! Concurrent writes sharing a token are serialized with a per-token async
//! lock, held by the caller from the lookup until the record is written.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::clock::SharedClock;
use crate::config::IdempotencyConfig;
use crate::http::response::ProxyResponse;

#[derive(Debug, Clone)]
struct IdempotencyRecord {
    response: ProxyResponse,
    recorded_at: Instant,
}

/// Hash of a raw idempotency token, exactly as its header bytes arrived.
pub fn token_hash(token: &[u8]) -> String {
    format!("{:x}", Sha256::digest(token))
}

/// Held while a write with a given token is in flight.
pub type TokenGuard = OwnedMutexGuard<()>;

#[derive(Debug)]
pub struct IdempotencyStore {
    records: DashMap<String, IdempotencyRecord>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    ttl: Duration,
    clock: SharedClock,
}

impl IdempotencyStore {
    pub fn new(config: &IdempotencyConfig, clock: SharedClock) -> Self {
        Self {
            records: DashMap::new(),
            in_flight: DashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            clock,
        }
    }

    /// Memoized response for `token_hash` if it is still within the TTL.
    pub fn lookup(&self, token_hash: &str) -> Option<ProxyResponse> {
        let now = self.clock.now();
        let record = self.records.get(token_hash)?;
        if now.saturating_duration_since(record.recorded_at) < self.ttl {
            Some(record.response.clone())
        } else {
            None
        }
    }

    /// Memoize `response`, replacing any previous record for the token.
    pub fn record(&self, token_hash: String, response: ProxyResponse) {
        let record = IdempotencyRecord {
            response,
            recorded_at: self.clock.now(),
        };
        self.records.insert(token_hash, record);
    }

    /// Wait for exclusive use of `token_hash`.
    pub async fn lock_token(&self, token_hash: &str) -> TokenGuard {
        let lock = self
            .in_flight
            .entry(token_hash.to_string())
            .or_default()
            .clone();
        // The map guard is released above; never await while holding it
        lock.lock_owned().await
    }

    /// Drop stale records and idle token locks. Returns how many records were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records
            .retain(|_, r| now.saturating_duration_since(r.recorded_at) < self.ttl);
        // Only the map holds an idle lock
        self.in_flight.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
