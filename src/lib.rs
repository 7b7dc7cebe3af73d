//! Resilient inference gateway library.

pub mod admin;
pub mod backend;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{CircuitBreaker, GatewayError, ResiliencePipeline, RetryPolicy};
