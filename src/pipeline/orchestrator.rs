//! Per-request orchestration.
//!
//! ```text
//! RECEIVED → rate_limit → waf → idempotency (POST) → cache (GET)
//!          → FORWARD → STORE (cache / idempotency) → RESPONDED
//! ```
//!
//! Any stage may end the request early. Counters:
//! - total requests: every request
//! - threats blocked: rate-limit denial or WAF match
//! - cache hits: cache replay only

use std::sync::Arc;

use axum::http::HeaderName;

use crate::clock::SharedClock;
use crate::config::{ConfigError, GatewayConfig, GatewaySettings, SettingsStore, ValidationError};
use crate::error::GatewayError;
use crate::http::request::InboundRequest;
use crate::http::response::ProxyResponse;
use crate::observability::metrics::{self, GatewayMetrics};
use crate::pipeline::stage::{Replay, RequestKeys, Stage, StageContext, Verdict};
use crate::pipeline::stages::{CacheStage, IdempotencyStage, RateLimitStage, WafStage};
use crate::security::rate_limit::RateLimiter;
use crate::security::waf::WafInspector;
use crate::store::{IdempotencyStore, ResponseCache};
use crate::upstream::{Forward, HttpForwarder};

/// How a successful request was answered.
#[derive(Debug)]
pub enum Outcome {
    Forwarded(ProxyResponse),
    CacheHit(ProxyResponse),
    IdempotentReplay(ProxyResponse),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Forwarded(_) => "forwarded",
            Outcome::CacheHit(_) => "cache_hit",
            Outcome::IdempotentReplay(_) => "idempotent_replay",
        }
    }

    pub fn response(&self) -> &ProxyResponse {
        match self {
            Outcome::Forwarded(r) | Outcome::CacheHit(r) | Outcome::IdempotentReplay(r) => r,
        }
    }

    pub fn into_inner(self) -> ProxyResponse {
        match self {
            Outcome::Forwarded(r) | Outcome::CacheHit(r) | Outcome::IdempotentReplay(r) => r,
        }
    }
}

/// The request-processing pipeline and the state it shares across requests.
#[derive(Debug)]
pub struct Pipeline<F: Forward = HttpForwarder> {
    settings: Arc<SettingsStore>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    idempotency: Arc<IdempotencyStore>,
    idempotency_header: HeaderName,
    /// Checks that may reject: run for every request.
    admission: Vec<Box<dyn Stage>>,
    /// Checks that may answer from memory: run after the token lock.
    memo: Vec<Box<dyn Stage>>,
    forwarder: F,
    metrics: Arc<GatewayMetrics>,
}

impl<F: Forward> Pipeline<F> {
    pub fn new(
        config: &GatewayConfig,
        settings: Arc<SettingsStore>,
        forwarder: F,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit, clock.clone()));
        let cache = Arc::new(ResponseCache::new(&config.cache, clock.clone()));
        let idempotency = Arc::new(IdempotencyStore::new(&config.idempotency, clock));
        let inspector = Arc::new(WafInspector::with_extra_patterns(&config.waf.extra_signatures)?);
        let idempotency_header = HeaderName::from_bytes(config.idempotency.header.as_bytes())
            .map_err(|_| {
                ConfigError::Validation(vec![ValidationError::InvalidHeader(
                    config.idempotency.header.clone(),
                )])
            })?;

        let admission: Vec<Box<dyn Stage>> = vec![
            Box::new(RateLimitStage::new(rate_limiter.clone())),
            Box::new(WafStage::new(inspector)),
        ];
        let memo: Vec<Box<dyn Stage>> = vec![
            Box::new(IdempotencyStage::new(idempotency.clone())),
            Box::new(CacheStage::new(cache.clone())),
        ];

        Ok(Self {
            settings,
            rate_limiter,
            cache,
            idempotency,
            idempotency_header,
            admission,
            memo,
            forwarder,
            metrics: Arc::new(GatewayMetrics::new()),
        })
    }

    /// Stage names in evaluation order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.admission
            .iter()
            .chain(self.memo.iter())
            .map(|s| s.name())
            .collect()
    }

    /// Run one request through every stage, forwarding on a full miss.
    pub async fn handle(&self, request: InboundRequest) -> Result<Outcome, GatewayError> {
        self.metrics.inc_total_requests();

        let settings = self.settings.snapshot();
        let keys = RequestKeys::derive(&request, &settings, &self.idempotency_header);
        let ctx = StageContext {
            request: &request,
            settings: &settings,
            keys: &keys,
        };

        if let Some(early) = self.run_stages(&self.admission, &ctx) {
            return early;
        }

        // Writes sharing a token wait here, so only the first one forwards
        let _token_guard = match keys.token_hash.as_deref() {
            Some(token) => Some(self.idempotency.lock_token(token).await),
            None => None,
        };

        if let Some(early) = self.run_stages(&self.memo, &ctx) {
            return early;
        }

        // Every origin reply is memoized; upstream failures never get here
        let response = self.forward(&request, &settings).await?;

        if let Some(fingerprint) = keys.fingerprint {
            if let Some(evicted) = self.cache.store(fingerprint, response.clone()) {
                tracing::debug!(request_id = %request.request_id, evicted = %evicted, "Cache full, evicted oldest entry");
            }
        }
        if let Some(token) = keys.token_hash {
            self.idempotency.record(token, response.clone());
        }

        Ok(Outcome::Forwarded(response))
    }

    fn run_stages(
        &self,
        stages: &[Box<dyn Stage>],
        ctx: &StageContext<'_>,
    ) -> Option<Result<Outcome, GatewayError>> {
        for stage in stages {
            match stage.evaluate(ctx) {
                Verdict::Continue => continue,
                Verdict::Reject(err) => {
                    tracing::warn!(
                        request_id = %ctx.request.request_id,
                        client = %ctx.request.client_id,
                        stage = stage.name(),
                        error = %err,
                        "Request rejected"
                    );
                    if err.is_client_rejection() {
                        self.metrics.inc_threats_blocked(err.kind());
                    }
                    return Some(Err(err));
                }
                Verdict::Replay(Replay::CacheHit(response)) => {
                    tracing::debug!(request_id = %ctx.request.request_id, stage = stage.name(), "Cache hit");
                    self.metrics.inc_cache_hits();
                    return Some(Ok(Outcome::CacheHit(response)));
                }
                Verdict::Replay(Replay::Idempotent(response)) => {
                    tracing::debug!(request_id = %ctx.request.request_id, stage = stage.name(), "Idempotent replay");
                    metrics::record_idempotent_replay();
                    return Some(Ok(Outcome::IdempotentReplay(response)));
                }
            }
        }
        None
    }

    async fn forward(
        &self,
        request: &InboundRequest,
        settings: &GatewaySettings,
    ) -> Result<ProxyResponse, GatewayError> {
        let origin = &settings.target_backend_url;
        tracing::debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path(),
            origin = %origin,
            "Forwarding to origin"
        );

        self.forwarder
            .forward(request, origin)
            .await
            .inspect_err(|e| {
                tracing::error!(request_id = %request.request_id, origin = %origin, error = %e, "Upstream error");
            })
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn idempotency_store(&self) -> &Arc<IdempotencyStore> {
        &self.idempotency
    }

    pub fn response_cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}
