//! Configuration schema definitions.
//!
//! This module defines the complete static configuration of the gateway.
//! All types derive Serde traits for deserialization from TOML, and every
//! field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::config::settings::GatewaySettings;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Overall request deadline.
    pub timeouts: TimeoutConfig,

    /// Forwarding to the origin.
    pub upstream: UpstreamConfig,

    /// Initial live settings (origin URL, toggles, rate threshold).
    pub policies: GatewaySettings,

    /// Sliding-window parameters.
    pub rate_limit: RateLimitConfig,

    /// Response cache bounds.
    pub cache: CacheConfig,

    /// Idempotency store parameters.
    pub idempotency: IdempotencyConfig,

    /// Additional WAF signatures.
    pub waf: WafConfig,

    /// Administrative surface.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum buffered request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for the inbound side.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Origin forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Deadline for one forward (send + full response body) in seconds.
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Largest origin response body buffered, in bytes.
    pub max_response_size: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 5,
            max_response_size: 10 * 1024 * 1024,
        }
    }
}

/// Rate limiting configuration. The threshold itself is a live setting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sliding window length in seconds.
    pub window_secs: u64,

    /// How often idle client windows are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            sweep_interval_secs: 60,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry freshness in seconds.
    pub ttl_secs: u64,

    /// Maximum number of entries.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            capacity: 1000,
        }
    }
}

/// Idempotency store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Record lifetime in seconds.
    pub ttl_secs: u64,

    /// Request header carrying the client token.
    pub header: String,

    /// How often stale records are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            header: "x-idempotency-key".to_string(),
            sweep_interval_secs: 300,
        }
    }
}

/// WAF configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WafConfig {
    /// Case-insensitive regular expressions appended after the built-in set.
    pub extra_signatures: Vec<String>,
}

/// Administrative surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required on admin routes. Open when unset.
    pub api_key: Option<String>,

    /// Origins allowed to call the admin API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
