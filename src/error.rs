//! Request-path error taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use thiserror::Error;

/// Errors that end a proxied request without an origin response.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Client exceeded its sliding-window threshold.
    #[error("Too Many Requests")]
    RateLimited,

    /// Payload matched a WAF signature.
    #[error("Security Block: {signature}")]
    ThreatDetected { signature: String },

    /// Request body exceeded the configured limit.
    #[error("Payload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Request body could not be read (client abort, broken framing).
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Origin did not answer within the forwarding timeout.
    #[error("Upstream timed out after {0} seconds")]
    UpstreamTimeout(u64),

    /// Origin unreachable or transport failure.
    #[error("Upstream request failed: {0}")]
    UpstreamUnavailable(String),

    /// Origin URL and request path did not form a valid URI.
    #[error("Invalid upstream URI: {0}")]
    InvalidUpstreamUri(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ThreatDetected { .. } => StatusCode::FORBIDDEN,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamUnavailable(_) | GatewayError::InvalidUpstreamUri(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Rejections caused by the client rather than the origin.
    pub fn is_client_rejection(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited | GatewayError::ThreatDetected { .. }
        )
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::RateLimited => "rate_limited",
            GatewayError::ThreatDetected { .. } => "waf_blocked",
            GatewayError::PayloadTooLarge(_) => "payload_too_large",
            GatewayError::MalformedBody(_) => "malformed_body",
            GatewayError::UpstreamTimeout(_) => "upstream_timeout",
            GatewayError::UpstreamUnavailable(_) => "upstream_unavailable",
            GatewayError::InvalidUpstreamUri(_) => "invalid_upstream_uri",
        }
    }
}

/// Whether a body read failed because it hit its length limit.
pub(crate) fn is_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Signature names stay in the logs, not in the reply
        let body = match &self {
            GatewayError::ThreatDetected { .. } => "Security Block".to_string(),
            other => other.to_string(),
        };
        (self.status(), body).into_response()
    }
}
