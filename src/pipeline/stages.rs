//! The four decision stages, in pipeline order.

use std::sync::Arc;

use crate::error::GatewayError;
use crate::pipeline::stage::{Replay, Stage, StageContext, Verdict};
use crate::security::rate_limit::RateLimiter;
use crate::security::waf::WafInspector;
use crate::store::{IdempotencyStore, ResponseCache};

/// Sliding-window admission per client.
#[derive(Debug)]
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn evaluate(&self, ctx: &StageContext<'_>) -> Verdict {
        if !ctx.settings.rate_limit_enabled {
            return Verdict::Continue;
        }
        if self
            .limiter
            .admit(&ctx.request.client_id, ctx.settings.rate_limit_per_minute)
        {
            Verdict::Continue
        } else {
            Verdict::Reject(GatewayError::RateLimited)
        }
    }
}

/// Signature scan of the request body.
#[derive(Debug)]
pub struct WafStage {
    inspector: Arc<WafInspector>,
}

impl WafStage {
    pub fn new(inspector: Arc<WafInspector>) -> Self {
        Self { inspector }
    }
}

impl Stage for WafStage {
    fn name(&self) -> &'static str {
        "waf"
    }

    fn evaluate(&self, ctx: &StageContext<'_>) -> Verdict {
        if !ctx.settings.waf_enabled {
            return Verdict::Continue;
        }
        match self.inspector.inspect(&ctx.request.body) {
            Some(signature) => Verdict::Reject(GatewayError::ThreatDetected {
                signature: signature.to_string(),
            }),
            None => Verdict::Continue,
        }
    }
}

/// Replay of a memoized write.
#[derive(Debug)]
pub struct IdempotencyStage {
    store: Arc<IdempotencyStore>,
}

impl IdempotencyStage {
    pub fn new(store: Arc<IdempotencyStore>) -> Self {
        Self { store }
    }
}

impl Stage for IdempotencyStage {
    fn name(&self) -> &'static str {
        "idempotency"
    }

    fn evaluate(&self, ctx: &StageContext<'_>) -> Verdict {
        ctx.keys
            .token_hash
            .as_deref()
            .and_then(|token| self.store.lookup(token))
            .map_or(Verdict::Continue, |response| {
                Verdict::Replay(Replay::Idempotent(response))
            })
    }
}

/// Replay of a cached read.
#[derive(Debug)]
pub struct CacheStage {
    cache: Arc<ResponseCache>,
}

impl CacheStage {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }
}

impl Stage for CacheStage {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn evaluate(&self, ctx: &StageContext<'_>) -> Verdict {
        ctx.keys
            .fingerprint
            .as_deref()
            .and_then(|fp| self.cache.lookup(fp))
            .map_or(Verdict::Continue, |(response, age)| {
                Verdict::Replay(Replay::CacheHit(response.with_age(age)))
            })
    }
}
