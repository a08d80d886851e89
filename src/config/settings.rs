//! Live gateway settings.
//!
//! # Data Flow
//! ```text
//! startup:       [policies] section → SettingsStore::new
//! admin update:  JSON → SettingsUpdate (validated) → merge → atomic swap
//! file reload:   [policies] section → SettingsStore::replace
//! request path:  SettingsStore::snapshot() once per request
//! ```
//!
//! # Design Decisions
//! - Whole-object replacement through `ArcSwap`: a request sees either the
//!   old or the new settings, never a mix
//! - A partial update keeps every field it omits
//! - Validation happens before the swap, so a rejected update mutates nothing

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Process-wide settings read on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Base URL of the origin service.
    pub target_backend_url: Url,
    pub rate_limit_enabled: bool,
    pub cache_enabled: bool,
    pub idempotency_enabled: bool,
    pub waf_enabled: bool,
    /// Requests admitted per client per window.
    pub rate_limit_per_minute: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            target_backend_url: Url::parse("http://localhost:3001")
                .expect("default origin URL is valid"),
            rate_limit_enabled: true,
            cache_enabled: true,
            idempotency_enabled: true,
            waf_enabled: true,
            rate_limit_per_minute: 100,
        }
    }
}

/// Errors rejecting an administrative update.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Body is not a JSON object of the expected field types.
    #[error("malformed settings update: {0}")]
    Malformed(String),

    /// A field parsed but holds an unacceptable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A partial settings update. Absent (or null) fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub target_backend_url: Option<String>,
    pub rate_limit_enabled: Option<bool>,
    pub cache_enabled: Option<bool>,
    pub idempotency_enabled: Option<bool>,
    pub waf_enabled: Option<bool>,
    pub rate_limit_per_minute: Option<u32>,
}

/// An update whose fields have all been checked.
#[derive(Debug, Clone)]
pub struct ValidatedUpdate {
    target_backend_url: Option<Url>,
    rate_limit_enabled: Option<bool>,
    cache_enabled: Option<bool>,
    idempotency_enabled: Option<bool>,
    waf_enabled: Option<bool>,
    rate_limit_per_minute: Option<u32>,
}

impl SettingsUpdate {
    pub fn from_json(body: &[u8]) -> Result<Self, SettingsError> {
        serde_json::from_slice(body).map_err(|e| SettingsError::Malformed(e.to_string()))
    }

    pub fn validate(self) -> Result<ValidatedUpdate, SettingsError> {
        let target_backend_url = match self.target_backend_url {
            Some(raw) => {
                let url = parse_origin(&raw).map_err(|reason| SettingsError::InvalidField {
                    field: "target_backend_url",
                    reason,
                })?;
                Some(url)
            }
            None => None,
        };

        if self.rate_limit_per_minute == Some(0) {
            return Err(SettingsError::InvalidField {
                field: "rate_limit_per_minute",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(ValidatedUpdate {
            target_backend_url,
            rate_limit_enabled: self.rate_limit_enabled,
            cache_enabled: self.cache_enabled,
            idempotency_enabled: self.idempotency_enabled,
            waf_enabled: self.waf_enabled,
            rate_limit_per_minute: self.rate_limit_per_minute,
        })
    }
}

/// Parse and check an origin base URL.
pub fn parse_origin(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    check_origin(&url)?;
    Ok(url)
}

/// Only plain HTTP origins with a host are supported.
pub fn check_origin(url: &Url) -> Result<(), String> {
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}', expected http", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("origin URL must not carry a query or fragment".to_string());
    }
    Ok(())
}

impl GatewaySettings {
    /// Copy of `self` with every field present in `update` replaced.
    pub fn merged(&self, update: &ValidatedUpdate) -> Self {
        Self {
            target_backend_url: update
                .target_backend_url
                .clone()
                .unwrap_or_else(|| self.target_backend_url.clone()),
            rate_limit_enabled: update.rate_limit_enabled.unwrap_or(self.rate_limit_enabled),
            cache_enabled: update.cache_enabled.unwrap_or(self.cache_enabled),
            idempotency_enabled: update.idempotency_enabled.unwrap_or(self.idempotency_enabled),
            waf_enabled: update.waf_enabled.unwrap_or(self.waf_enabled),
            rate_limit_per_minute: update
                .rate_limit_per_minute
                .unwrap_or(self.rate_limit_per_minute),
        }
    }
}

/// Owner of the live settings.
#[derive(Debug)]
pub struct SettingsStore {
    current: ArcSwap<GatewaySettings>,
}

impl SettingsStore {
    pub fn new(initial: GatewaySettings) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Consistent view of the settings for one request.
    pub fn snapshot(&self) -> Arc<GatewaySettings> {
        self.current.load_full()
    }

    /// Validate and apply a partial update. Returns the settings now in effect.
    pub fn apply(&self, update: SettingsUpdate) -> Result<Arc<GatewaySettings>, SettingsError> {
        let update = update.validate()?;
        // rcu retries the merge if another update lands in between
        let previous = self
            .current
            .rcu(|current| Arc::new(current.merged(&update)));
        let applied = Arc::new(previous.merged(&update));

        tracing::info!(
            origin = %applied.target_backend_url,
            rate_limit_enabled = applied.rate_limit_enabled,
            cache_enabled = applied.cache_enabled,
            idempotency_enabled = applied.idempotency_enabled,
            waf_enabled = applied.waf_enabled,
            rate_limit_per_minute = applied.rate_limit_per_minute,
            "Settings updated"
        );
        Ok(applied)
    }

    /// Replace the settings wholesale (configuration reload).
    pub fn replace(&self, settings: GatewaySettings) {
        self.current.store(Arc::new(settings));
    }
}
