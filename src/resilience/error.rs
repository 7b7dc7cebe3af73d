//! Request-level error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::resilience::outcome::{Failure, FailureKind};

/// Why an inference request did not produce a backend answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network failure, timeout, 5xx or 404; retries were exhausted.
    #[error("transient backend failure: {0}")]
    Transient(Failure),

    /// 4xx other than 404; never retried.
    #[error("permanent backend failure: {0}")]
    Permanent(Failure),

    /// The circuit breaker rejected the call without contacting the backend.
    #[error("circuit breaker open, retry after {retry_after:?}")]
    BreakerOpen { retry_after: Duration },

    /// The overall request deadline passed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// The request was abandoned because the gateway is shutting down.
    #[error("request cancelled")]
    Cancelled,

    /// The inbound body is not well-formed JSON.
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
}

impl GatewayError {
    /// Stable machine-readable code used in error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Transient(failure) | GatewayError::Permanent(failure) => match failure.kind {
                FailureKind::Status(_) => "backend_error",
                FailureKind::Timeout => "backend_timeout",
                FailureKind::Connect => "backend_unreachable",
            },
            GatewayError::BreakerOpen { .. } => "circuit_open",
            GatewayError::DeadlineExceeded => "deadline_exceeded",
            GatewayError::Cancelled => "shutting_down",
            GatewayError::InvalidPayload(_) => "invalid_payload",
        }
    }
}
