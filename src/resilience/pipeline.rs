//! Breaker → retry → caller composition used by the proxy handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::backend::{BackendCaller, BackendResponse, InferenceRequest};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::GatewayError;
use crate::resilience::outcome::Outcome;
use crate::resilience::retries::RetryPolicy;

/// The resilience pipeline for one backend target.
#[derive(Debug)]
pub struct ResiliencePipeline {
    caller: Arc<dyn BackendCaller>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    attempt_timeout: Duration,
}

impl ResiliencePipeline {
    pub fn new(
        caller: Arc<dyn BackendCaller>,
        retry: RetryPolicy,
        breaker: Arc<CircuitBreaker>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            caller,
            retry,
            breaker,
            attempt_timeout,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Forward one inference request through breaker, retry, and caller.
    pub async fn forward(
        &self,
        request: &InferenceRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendResponse, GatewayError> {
        self.forward_until(request, cancel, None).await
    }

    /// Like [`forward`](Self::forward), bounded by an overall request deadline.
    pub async fn forward_until(
        &self,
        request: &InferenceRequest,
        cancel: &CancellationToken,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<BackendResponse, GatewayError> {
        let guarded = self
            .breaker
            .execute(|| {
                self.retry
                    .execute_until(|attempt| self.attempt(request, attempt), cancel, deadline)
            })
            .await;

        match guarded {
            Ok(Outcome::Success(response)) => Ok(response),
            Ok(Outcome::Retryable(failure)) => Err(GatewayError::Transient(failure)),
            Ok(Outcome::NonRetryable(failure)) => Err(GatewayError::Permanent(failure)),
            Ok(Outcome::Cancelled) => Err(GatewayError::Cancelled),
            Ok(Outcome::Expired) => Err(GatewayError::DeadlineExceeded),
            Err(_) => Err(GatewayError::BreakerOpen {
                retry_after: self.breaker.remaining_cooldown(),
            }),
        }
    }

    async fn attempt(&self, request: &InferenceRequest, attempt: u32) -> Outcome<BackendResponse> {
        let started = Instant::now();
        let outcome = self.caller.call(request, self.attempt_timeout).await;
        tracing::debug!(
            attempt,
            outcome = outcome.label(),
            elapsed = ?started.elapsed(),
            "Backend attempt finished"
        );
        metrics::record_attempt(outcome.label(), started);
        outcome
    }
}
