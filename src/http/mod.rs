//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, admin routes)
//!     → request.rs (request ID, buffer body, classify)
//!     → [pipeline decides: reject, replay or forward]
//!     → response.rs (buffered origin or memoized response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, MakeRequestUuid, RequestKind, X_REQUEST_ID};
pub use response::ProxyResponse;
pub use server::{AppState, GatewayServer};
