//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for requests that lack one
//! - Buffer an inbound request into the shape the pipeline inspects
//! - Classify requests as reads, writes or pass-through
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body size limit enforced while buffering (413 on overflow, 400 when the
//!   body cannot be read at all)
//! - Only `host` is dropped before forwarding; everything else is relayed

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::{is_length_limit, GatewayError};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// How the memoization stages treat a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// GET: eligible for the response cache.
    Read,
    /// POST: eligible for idempotent replay.
    Write,
    /// Everything else: always forwarded.
    PassThrough,
}

impl From<&Method> for RequestKind {
    fn from(method: &Method) -> Self {
        if method == Method::GET {
            RequestKind::Read
        } else if method == Method::POST {
            RequestKind::Write
        } else {
            RequestKind::PassThrough
        }
    }
}

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Client identity used for rate limiting (peer IP).
    pub client_id: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Correlation ID for logs.
    pub request_id: String,
}

impl InboundRequest {
    /// Buffer `request`, rejecting bodies over `max_body_size` bytes.
    pub async fn from_request(
        client_id: String,
        request: Request<Body>,
        max_body_size: usize,
    ) -> Result<Self, GatewayError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(|e| {
                if is_length_limit(&e) {
                    GatewayError::PayloadTooLarge(max_body_size)
                } else {
                    GatewayError::MalformedBody(e.to_string())
                }
            })?;

        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            client_id,
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            request_id,
        })
    }

    pub fn kind(&self) -> RequestKind {
        RequestKind::from(&self.method)
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Raw bytes of `header` when present and non-empty. Obs-text bytes
    /// are kept as sent.
    pub fn header_bytes(&self, header: &HeaderName) -> Option<&[u8]> {
        self.headers
            .get(header)
            .map(HeaderValue::as_bytes)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind() {
        assert_eq!(RequestKind::from(&Method::GET), RequestKind::Read);
        assert_eq!(RequestKind::from(&Method::POST), RequestKind::Write);
        assert_eq!(RequestKind::from(&Method::PUT), RequestKind::PassThrough);
        assert_eq!(RequestKind::from(&Method::PATCH), RequestKind::PassThrough);
        assert_eq!(RequestKind::from(&Method::DELETE), RequestKind::PassThrough);
    }

    #[tokio::test]
    async fn test_from_request_buffers_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/echo?x=1")
            .header(X_REQUEST_ID, "abc")
            .body(Body::from("hello"))
            .unwrap();

        let inbound = InboundRequest::from_request("10.0.0.1".into(), request, 1024)
            .await
            .unwrap();
        assert_eq!(inbound.body, Bytes::from_static(b"hello"));
        assert_eq!(inbound.path(), "/api/echo");
        assert_eq!(inbound.query(), Some("x=1"));
        assert_eq!(inbound.request_id, "abc");
    }

    #[tokio::test]
    async fn test_from_request_rejects_large_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(vec![b'a'; 64]))
            .unwrap();

        let err = InboundRequest::from_request("c".into(), request, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge(16)));
    }

    #[tokio::test]
    async fn test_from_request_aborted_body_is_bad_request() {
        let chunks = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ]);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from_stream(chunks))
            .unwrap();

        let err = InboundRequest::from_request("c".into(), request, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedBody(_)));
    }

    #[test]
    fn test_header_bytes_keeps_obs_text() {
        let mut headers = HeaderMap::new();
        headers.insert("x-idempotency-key", HeaderValue::from_bytes(b"caf\xe9-1").unwrap());
        headers.insert("x-empty", HeaderValue::from_static(""));
        let inbound = InboundRequest {
            client_id: "c".into(),
            method: Method::POST,
            uri: "/".parse().unwrap(),
            headers,
            body: Bytes::new(),
            request_id: "r".into(),
        };

        assert_eq!(
            inbound.header_bytes(&HeaderName::from_static("x-idempotency-key")),
            Some(&b"caf\xe9-1"[..])
        );
        assert_eq!(inbound.header_bytes(&HeaderName::from_static("x-empty")), None);
        assert_eq!(inbound.header_bytes(&HeaderName::from_static("x-missing")), None);
    }
}
