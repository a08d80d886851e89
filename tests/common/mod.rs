//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{body::Bytes, http::{Method, StatusCode, Uri}, Router};
use backpack_gateway::clock::{MockClock, SharedClock, SystemClock};
use backpack_gateway::config::GatewayConfig;
use backpack_gateway::http::GatewayServer;
use backpack_gateway::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A mock origin on an ephemeral port.
///
/// Answers every request with `origin-<n> <METHOD> <path?query> <body>`,
/// where `n` counts calls. Paths starting with `/fail` answer 500.
pub struct MockOrigin {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
}

impl MockOrigin {
    pub async fn start() -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let app = Router::new().fallback(move |method: Method, uri: Uri, body: Bytes| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let status = if uri.path().starts_with("/fail") {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::OK
                };
                let text = format!("origin-{n} {method} {uri} {}", String::from_utf8_lossy(&body));
                (status, [("x-origin-call", n.to_string())], text)
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, calls }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> url::Url {
        url::Url::parse(&format!("http://{}", self.addr)).unwrap()
    }
}

/// A running gateway, serving until `shutdown` is triggered.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    /// Feeds configuration reloads to the running server.
    pub reloads: mpsc::UnboundedSender<GatewayConfig>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway in front of `origin`, letting the caller adjust config.
pub async fn start_gateway(
    origin: url::Url,
    configure: impl FnOnce(&mut GatewayConfig),
) -> TestGateway {
    launch(origin, configure, SystemClock::shared()).await
}

/// Start a gateway whose TTLs follow the returned clock.
pub async fn start_gateway_with_clock(
    origin: url::Url,
    configure: impl FnOnce(&mut GatewayConfig),
) -> (TestGateway, MockClock) {
    let clock = MockClock::new(Instant::now());
    let gateway = launch(origin, configure, Arc::new(clock.clone())).await;
    (gateway, clock)
}

async fn launch(
    origin: url::Url,
    configure: impl FnOnce(&mut GatewayConfig),
    clock: SharedClock,
) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.policies.target_backend_url = origin;
    config.listener.bind_address = "127.0.0.1:0".into();
    configure(&mut config);

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::with_clock(config, clock).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (reloads, config_updates) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        shutdown,
        reloads,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
