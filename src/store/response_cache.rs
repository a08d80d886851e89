//! Bounded, TTL'd memo of read responses.
//!
//! # Responsibilities
//! - Key entries by a fingerprint of method, path and query string
//! - Treat entries older than the TTL as misses without purging them
//! - Enforce the capacity bound by evicting the oldest insertion
//!
//! # Design Decisions
//! - Lookups use `peek`, so a hit never changes an entry's eviction order.
//!   This is insertion-order eviction, deliberately weaker than LRU.
//! - Re-storing an existing fingerprint replaces the entry in place and keeps
//!   its eviction position

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::clock::SharedClock;
use crate::config::CacheConfig;
use crate::http::response::ProxyResponse;

/// Cached origin response plus the instant it was stored.
#[derive(Debug, Clone)]
struct CacheEntry {
    response: ProxyResponse,
    inserted_at: Instant,
}

/// Deterministic cache key. Headers and body never take part.
pub fn fingerprint(method: &str, path: &str, query: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b" ");
    hasher.update(path.as_bytes());
    if let Some(query) = query {
        hasher.update(b"?");
        hasher.update(query.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    clock: SharedClock,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig, clock: SharedClock) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(config.ttl_secs),
            clock,
        }
    }

    /// Fresh entry for `fingerprint` together with its age.
    pub fn lookup(&self, fingerprint: &str) -> Option<(ProxyResponse, Duration)> {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.peek(fingerprint)?;
        let age = now.saturating_duration_since(entry.inserted_at);
        if age < self.ttl {
            Some((entry.response.clone(), age))
        } else {
            None
        }
    }

    /// Store `response`. Returns the fingerprint evicted to make room, if any.
    pub fn store(&self, fingerprint: String, response: ProxyResponse) -> Option<String> {
        let entry = CacheEntry {
            response,
            inserted_at: self.clock.now(),
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.peek_mut(&fingerprint) {
            *existing = entry;
            return None;
        }
        entries.push(fingerprint, entry).map(|(evicted, _)| evicted)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cap()
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode};
    use std::sync::Arc;

    fn response(body: &'static str) -> ProxyResponse {
        ProxyResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(body.as_bytes()))
    }

    fn cache(capacity: usize) -> (ResponseCache, MockClock) {
        let clock = MockClock::new(Instant::now());
        let config = CacheConfig {
            capacity,
            ..CacheConfig::default()
        };
        (ResponseCache::new(&config, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_fingerprint_inputs() {
        let a = fingerprint("GET", "/api/data", Some("page=1"));
        assert_eq!(a, fingerprint("GET", "/api/data", Some("page=1")));
        assert_ne!(a, fingerprint("GET", "/api/data", Some("page=2")));
        assert_ne!(a, fingerprint("POST", "/api/data", Some("page=1")));
        assert_ne!(fingerprint("GET", "/a", None), fingerprint("GET", "/a", Some("")));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hit_within_ttl() {
        let (cache, clock) = cache(10);
        cache.store("k".into(), response("v1"));

        clock.advance(Duration::from_secs(299));
        let (hit, age) = cache.lookup("k").unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"v1"));
        assert_eq!(age, Duration::from_secs(299));
    }

    #[test]
    fn test_stale_is_miss_but_not_purged() {
        let (cache, clock) = cache(10);
        cache.store("k".into(), response("v1"));

        clock.advance(Duration::from_secs(300));
        assert!(cache.lookup("k").is_none());
        assert_eq!(cache.len(), 1);

        cache.store("k".into(), response("v2"));
        assert_eq!(cache.lookup("k").unwrap().0.body, Bytes::from_static(b"v2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let (cache, _) = cache(1000);
        for i in 0..1000 {
            assert!(cache.store(format!("k{i}"), response("v")).is_none());
        }
        assert_eq!(cache.len(), 1000);

        let evicted = cache.store("k1000".into(), response("v"));
        assert_eq!(evicted.as_deref(), Some("k0"));
        assert_eq!(cache.len(), 1000);
        assert!(cache.lookup("k0").is_none());
        assert!(cache.lookup("k1").is_some());
    }

    #[test]
    fn test_hit_does_not_promote() {
        let (cache, _) = cache(2);
        cache.store("a".into(), response("a"));
        cache.store("b".into(), response("b"));

        assert!(cache.lookup("a").is_some());
        let evicted = cache.store("c".into(), response("c"));
        assert_eq!(evicted.as_deref(), Some("a"));
    }

    #[test]
    fn test_restore_keeps_eviction_position() {
        let (cache, clock) = cache(2);
        cache.store("a".into(), response("a1"));
        cache.store("b".into(), response("b"));

        clock.advance(Duration::from_secs(10));
        assert!(cache.store("a".into(), response("a2")).is_none());
        let (hit, age) = cache.lookup("a").unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"a2"));
        assert_eq!(age, Duration::ZERO);

        let evicted = cache.store("c".into(), response("c"));
        assert_eq!(evicted.as_deref(), Some("a"));
        assert!(cache.lookup("b").is_some());
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let (cache, _) = cache(0);
        assert_eq!(cache.capacity(), 1);
    }
}
