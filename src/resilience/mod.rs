//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Inference request:
//!     → circuit_breaker.rs (fail fast while open, single probe while half-open)
//!     → retries.rs (retry retryable outcomes with backoff.rs delays,
//!                   bounded by the timeouts.rs request deadline)
//!     → backend::caller (one attempt, bounded by the attempt timeout)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend attempt has a deadline
//! - Failures are values (`Outcome`), never panics or exceptions
//! - Each layer only sees the classification of the layer beneath it
//! - `pipeline.rs` composes the layers; each one is usable on its own

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::GatewayError;
pub use outcome::{BreakerOpen, Failure, FailureKind, Outcome};
pub use pipeline::ResiliencePipeline;
pub use retries::{RetryPolicy, RetryPolicyConfig};
pub use timeouts::{deadline_after, expires_at};
