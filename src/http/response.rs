//! Response handling and transformation.
//!
//! # Responsibilities
//! - Hold a fully buffered origin response so it can be memoized and replayed
//! - Strip hop-by-hop framing headers that no longer describe the buffered body
//! - Convert into an Axum response
//!
//! # Design Decisions
//! - Bodies are buffered, not streamed: the cache and idempotency store need
//!   the complete payload
//! - Status, headers and body are otherwise passed through untouched

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Duration;

/// Headers describing the transport of one hop, never replayed.
const HOP_BY_HOP: [HeaderName; 3] = [
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
];

/// A complete origin response.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> Self {
        for name in HOP_BY_HOP.iter() {
            headers.remove(name);
        }
        Self {
            status,
            headers,
            body,
        }
    }

    /// Copy with an `age` header, used when replaying from cache.
    pub fn with_age(&self, age: Duration) -> Self {
        let mut replay = self.clone();
        replay
            .headers
            .insert(header::AGE, HeaderValue::from(age.as_secs()));
        replay
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = ProxyResponse::new(StatusCode::OK, headers, Bytes::from_static(b"{}"));
        assert!(resp.headers.get(header::TRANSFER_ENCODING).is_none());
        assert!(resp.headers.get(header::CONNECTION).is_none());
        assert_eq!(resp.headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_with_age() {
        let resp = ProxyResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new());
        let aged = resp.with_age(Duration::from_millis(42_900));
        assert_eq!(aged.headers[header::AGE], "42");
        assert!(resp.headers.get(header::AGE).is_none());
    }

    #[test]
    fn test_into_response_keeps_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-origin", HeaderValue::from_static("yes"));
        let resp = ProxyResponse::new(StatusCode::CREATED, headers, Bytes::from_static(b"made"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["x-origin"], "yes");
    }
}
