//! Origin forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest + origin base URL
//!     → forwarder.rs (rebuild URI, strip host, send with deadline)
//!     → ProxyResponse (status, headers, buffered body)
//! ```

pub mod forwarder;

pub use forwarder::{upstream_uri, Forward, HttpForwarder};
