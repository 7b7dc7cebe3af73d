//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → resilience configs handed to the pipeline at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; retry and breaker settings never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - An unusable backend address is a startup error, never a per-request one

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BackendConfig, CircuitBreakerSettings, GatewayConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RetryConfig, SecurityConfig, TimeoutConfig,
};
