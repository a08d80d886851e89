//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → [policies] seeds settings.rs (live, swappable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → [policies] swapped into the live settings
//!
//! On admin update:
//!     partial JSON → settings.rs validates → merged → atomic swap
//! ```
//!
//! # Design Decisions
//! - Static sections (listener, capacities, TTLs) apply at startup only
//! - Only the live settings change at runtime, always by whole-object swap
//! - All fields have defaults to allow minimal configs

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;
pub mod watcher;

pub use schema::{
    AdminConfig, CacheConfig, GatewayConfig, IdempotencyConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, TimeoutConfig, UpstreamConfig, WafConfig,
};
pub use settings::{GatewaySettings, SettingsError, SettingsStore, SettingsUpdate};
pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
