//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTLs, capacities, intervals > 0)
//! - Validate addresses, the origin URL and WAF patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::settings::check_origin;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("policies.target_backend_url: {0}")]
    InvalidOrigin(String),

    #[error("waf.extra_signatures pattern {pattern:?} does not compile: {reason}")]
    InvalidSignature { pattern: String, reason: String },

    #[error("timeouts.request_secs ({request}) is shorter than upstream.timeout_secs ({upstream})")]
    TimeoutOrder { request: u64, upstream: u64 },

    #[error("idempotency.header {0:?} is not a valid header name")]
    InvalidHeader(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let positive: [(&'static str, u64); 10] = [
        ("listener.max_body_size", config.listener.max_body_size as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("upstream.timeout_secs", config.upstream.timeout_secs),
        ("upstream.max_response_size", config.upstream.max_response_size as u64),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.sweep_interval_secs", config.rate_limit.sweep_interval_secs),
        ("cache.ttl_secs", config.cache.ttl_secs),
        ("cache.capacity", config.cache.capacity as u64),
        ("idempotency.ttl_secs", config.idempotency.ttl_secs),
        ("idempotency.sweep_interval_secs", config.idempotency.sweep_interval_secs),
    ];
    errors.extend(
        positive
            .into_iter()
            .filter(|(_, value)| *value == 0)
            .map(|(field, _)| ValidationError::Zero(field)),
    );
    if config.policies.rate_limit_per_minute == 0 {
        errors.push(ValidationError::Zero("policies.rate_limit_per_minute"));
    }

    if config.timeouts.request_secs < config.upstream.timeout_secs {
        errors.push(ValidationError::TimeoutOrder {
            request: config.timeouts.request_secs,
            upstream: config.upstream.timeout_secs,
        });
    }

    if let Err(reason) = check_origin(&config.policies.target_backend_url) {
        errors.push(ValidationError::InvalidOrigin(reason));
    }

    if axum::http::HeaderName::from_bytes(config.idempotency.header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeader(config.idempotency.header.clone()));
    }

    for pattern in &config.waf.extra_signatures {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ValidationError::InvalidSignature {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
