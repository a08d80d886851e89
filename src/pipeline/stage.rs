//! Decision stage contract.
//!
//! A stage looks at one request under one settings snapshot and either lets
//! it continue, rejects it, or answers it from memory. Stages never forward
//! and never touch metrics; the orchestrator owns both.

use axum::http::HeaderName;

use crate::config::GatewaySettings;
use crate::error::GatewayError;
use crate::http::request::{InboundRequest, RequestKind};
use crate::http::response::ProxyResponse;
use crate::store::idempotency::token_hash;
use crate::store::response_cache::fingerprint;

/// Result of evaluating one stage.
#[derive(Debug)]
pub enum Verdict {
    /// Hand the request to the next stage.
    Continue,
    /// Refuse the request; nothing is forwarded.
    Reject(GatewayError),
    /// Answer with a memoized response; nothing is forwarded.
    Replay(Replay),
}

/// Source of a memoized answer.
#[derive(Debug)]
pub enum Replay {
    CacheHit(ProxyResponse),
    Idempotent(ProxyResponse),
}

/// Memoization keys derived once per request.
///
/// A key is present only when its stage applies: the fingerprint for reads
/// with caching on, the token hash for writes carrying a token with
/// idempotency on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestKeys {
    pub fingerprint: Option<String>,
    pub token_hash: Option<String>,
}

impl RequestKeys {
    pub fn derive(
        request: &InboundRequest,
        settings: &GatewaySettings,
        idempotency_header: &HeaderName,
    ) -> Self {
        let mut keys = Self::default();
        match request.kind() {
            RequestKind::Read if settings.cache_enabled => {
                keys.fingerprint = Some(fingerprint(
                    request.method.as_str(),
                    request.path(),
                    request.query(),
                ));
            }
            RequestKind::Write if settings.idempotency_enabled => {
                keys.token_hash = request.header_bytes(idempotency_header).map(token_hash);
            }
            _ => {}
        }
        keys
    }
}

/// Everything a stage may look at.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub request: &'a InboundRequest,
    pub settings: &'a GatewaySettings,
    pub keys: &'a RequestKeys,
}

/// One pipeline decision.
pub trait Stage: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &StageContext<'_>) -> Verdict;
}
