//! Backpack Gateway Library
//!
//! A protective reverse proxy: every request passes rate limiting and WAF
//! inspection, then may be answered from the idempotency store or the
//! response cache before it is forwarded to the single configured origin.

pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod security;
pub mod store;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
