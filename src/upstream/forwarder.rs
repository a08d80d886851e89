//! Transparent relay to the origin.
//!
//! # Responsibilities
//! - Rebuild the request against the origin base URL (path and query kept)
//! - Relay method, headers (minus `host`) and the raw body untouched
//! - Buffer the origin response and return it verbatim
//! - Bound the whole exchange with a timeout and the buffered body with a size cap
//!
//! # Design Decisions
//! - Single attempt, no retries
//! - Timeouts and transport failures are distinct errors, never responses

use std::future::Future;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Uri},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{is_length_limit, GatewayError};
use crate::http::request::InboundRequest;
use crate::http::response::ProxyResponse;

/// Relays a request to an origin and returns its complete response.
pub trait Forward: Send + Sync + 'static {
    fn forward(
        &self,
        request: &InboundRequest,
        origin: &Url,
    ) -> impl Future<Output = Result<ProxyResponse, GatewayError>> + Send;
}

/// Join the origin base URL with the inbound path and query.
pub fn upstream_uri(origin: &Url, inbound: &Uri) -> Result<Uri, GatewayError> {
    let base = origin.as_str().trim_end_matches('/');
    let path_and_query = inbound
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{base}{path_and_query}")
        .parse::<Uri>()
        .map_err(|e| GatewayError::InvalidUpstreamUri(e.to_string()))
}

fn build_request(request: &InboundRequest, origin: &Url) -> Result<Request<Body>, GatewayError> {
    let uri = upstream_uri(origin, &request.uri)?;

    let mut builder = Request::builder().method(request.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in request.headers.iter() {
            if name != header::HOST {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    builder
        .body(Body::from(request.body.clone()))
        .map_err(|e| GatewayError::InvalidUpstreamUri(e.to_string()))
}

/// HTTP/1.1 forwarder over a pooled hyper client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    max_response_size: usize,
}

impl HttpForwarder {
    pub fn new(config: &UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_response_size: config.max_response_size,
        }
    }
}

impl Forward for HttpForwarder {
    fn forward(
        &self,
        request: &InboundRequest,
        origin: &Url,
    ) -> impl Future<Output = Result<ProxyResponse, GatewayError>> + Send {
        let client = self.client.clone();
        let timeout = self.timeout;
        let max_response_size = self.max_response_size;
        let built = build_request(request, origin);

        async move {
            let outbound = built?;
            let exchange = async {
                let response: hyper::Response<hyper::body::Incoming> = client
                    .request(outbound)
                    .await
                    .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;

                let (parts, body) = response.into_parts();
                let body = axum::body::to_bytes(Body::new(body), max_response_size)
                    .await
                    .map_err(|e| {
                        if is_length_limit(&e) {
                            GatewayError::UpstreamUnavailable(format!(
                                "response body exceeds {max_response_size} bytes"
                            ))
                        } else {
                            GatewayError::UpstreamUnavailable(e.to_string())
                        }
                    })?;

                Ok::<_, GatewayError>(ProxyResponse::new(parts.status, parts.headers, body))
            };

            match time::timeout(timeout, exchange).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::UpstreamTimeout(timeout.as_secs())),
            }
        }
    }
}
