//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router: admin routes plus the catch-all proxy route
//! - Wire up middleware (tracing, timeout, request ID, CORS)
//! - Buffer each request and hand it to the pipeline
//! - Spawn the sweepers and apply configuration reloads
//! - Serve until the shutdown signal

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Method, Request},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    map_response_body::MapResponseBodyLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::clock::{SharedClock, SystemClock};
use crate::config::{validate_config, ConfigError, GatewayConfig, SettingsStore};
use crate::http::request::{InboundRequest, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::pipeline::Pipeline;
use crate::store::Sweeper;
use crate::upstream::HttpForwarder;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_body_size: usize,
    pub api_key: Option<Arc<str>>,
}

/// HTTP front end of the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    pipeline: Arc<Pipeline>,
}

impl GatewayServer {
    /// Create a server whose initial settings come from `config.policies`.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a server whose stores age their entries against `clock`.
    ///
    /// The configuration is validated first; a zero sweep interval or
    /// capacity never reaches the stores.
    pub fn with_clock(config: GatewayConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let settings = Arc::new(SettingsStore::new(config.policies.clone()));
        let forwarder = HttpForwarder::new(&config.upstream);
        let pipeline = Arc::new(Pipeline::new(
            &config,
            settings,
            forwarder,
            clock,
        )?);

        let state = AppState {
            pipeline: pipeline.clone(),
            max_body_size: config.listener.max_body_size,
            api_key: config.admin.api_key.as_deref().map(Arc::from),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            pipeline,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/", proxy_methods())
            .route("/{*path}", proxy_methods())
            .merge(setup_admin_router(state.clone()))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(cors_layer(&config.admin.allowed_origins))
                    .layer(MapResponseBodyLayer::new(Body::new))
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration reloads arriving on `config_updates` replace the live
    /// settings with their `[policies]` section.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.config.policies.target_backend_url,
            "Gateway listening"
        );

        let sweepers = [
            Sweeper::new(
                self.pipeline.rate_limiter().clone(),
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            ),
            Sweeper::new(
                self.pipeline.idempotency_store().clone(),
                Duration::from_secs(self.config.idempotency.sweep_interval_secs),
            ),
        ];
        for sweeper in sweepers {
            tokio::spawn(sweeper.run(shutdown.resubscribe()));
        }

        let settings = self.pipeline.settings().clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => {
                            tracing::info!(
                                origin = %config.policies.target_backend_url,
                                rate_limit_per_minute = config.policies.rate_limit_per_minute,
                                "Applying reloaded policies"
                            );
                            settings.replace(config.policies);
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let mut shutdown = shutdown;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}

/// Methods dispatched into the pipeline; anything else answers 405.
fn proxy_methods() -> MethodRouter<AppState> {
    get(proxy_handler)
        .post(proxy_handler)
        .put(proxy_handler)
        .delete(proxy_handler)
        .patch(proxy_handler)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    let inbound =
        match InboundRequest::from_request(peer.ip().to_string(), request, state.max_body_size)
            .await
        {
            Ok(inbound) => inbound,
            Err(e) => {
                state.pipeline.metrics().inc_total_requests();
                tracing::warn!(client = %peer.ip(), error = %e, "Request body rejected");
                metrics::record_request(&method, e.status().as_u16(), e.kind(), start_time);
                return e.into_response();
            }
        };

    let request_id = inbound.request_id.clone();
    match state.pipeline.handle(inbound).await {
        Ok(outcome) => {
            let label = outcome.label();
            let response = outcome.into_inner();
            tracing::debug!(
                request_id = %request_id,
                outcome = label,
                status = response.status.as_u16(),
                "Request answered"
            );
            metrics::record_request(&method, response.status.as_u16(), label, start_time);
            response.into_response()
        }
        Err(e) => {
            metrics::record_request(&method, e.status().as_u16(), e.kind(), start_time);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::ValidationError;

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = GatewayConfig::default();
        config.rate_limit.sweep_interval_secs = 0;

        match GatewayServer::new(config) {
            Err(ConfigError::Validation(errors)) => assert!(
                errors.contains(&ValidationError::Zero("rate_limit.sweep_interval_secs"))
            ),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("server built from an invalid config"),
        }
    }

    #[tokio::test]
    async fn test_with_clock_seeds_settings_from_policies() {
        let mut config = GatewayConfig::default();
        config.policies.rate_limit_per_minute = 7;

        let clock = MockClock::new(Instant::now());
        let server = GatewayServer::with_clock(config, Arc::new(clock)).unwrap();
        assert_eq!(server.pipeline().settings().snapshot().rate_limit_per_minute, 7);
    }
}
