//! Outcome classification shared by every resilience layer.

use std::fmt;

use axum::http::StatusCode;

/// Why a backend attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend answered with a non-success status.
    Status(StatusCode),
    /// No response arrived within the per-attempt timeout.
    Timeout,
    /// The connection could not be established or broke mid-exchange.
    Connect,
}

/// A failed attempt with a human readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    pub fn status(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Status(status),
            reason: reason.into(),
        }
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            reason: reason.into(),
        }
    }

    pub fn connect(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Connect,
            reason: reason.into(),
        }
    }

    /// Backend status code, if the backend answered at all.
    pub fn backend_status(&self) -> Option<StatusCode> {
        match self.kind {
            FailureKind::Status(status) => Some(status),
            FailureKind::Timeout | FailureKind::Connect => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Status(status) => write!(f, "backend returned {}: {}", status, self.reason),
            FailureKind::Timeout => write!(f, "backend timed out: {}", self.reason),
            FailureKind::Connect => write!(f, "backend unreachable: {}", self.reason),
        }
    }
}

/// Result of one layer of the pipeline.
///
/// The backend caller only ever produces the first three variants.
/// `Cancelled` comes from the retry policy when the request was abandoned,
/// `Expired` when the request deadline passed before any attempt completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Retryable(Failure),
    NonRetryable(Failure),
    Cancelled,
    Expired,
}

impl<T> Outcome<T> {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Retryable(_) => "retryable",
            Outcome::NonRetryable(_) => "non_retryable",
            Outcome::Cancelled => "cancelled",
            Outcome::Expired => "expired",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Returned by the circuit breaker instead of running the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerOpen;

impl fmt::Display for BreakerOpen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("circuit breaker is open")
    }
}
