//! Retry logic.
//!
//! # Responsibilities
//! - Re-run an operation on retryable outcomes, up to `max_attempts` total
//! - Space attempts with exponential backoff
//! - Abandon the wait or the in-flight attempt as soon as the request is cancelled
//!
//! # Design Decisions
//! - Non-retryable outcomes return immediately; retrying a malformed request
//!   cannot help and would burn the breaker's failure budget
//! - Exhaustion returns the last retryable failure unchanged
//! - Waiting is a tokio sleep raced against the cancellation token
//! - The request deadline ends the loop with the last failure, never by
//!   cancelling the token, so shutdown stays distinguishable from expiry

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::outcome::{Failure, Outcome};
use crate::resilience::timeouts::expires_at;

/// Immutable retry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicyConfig {
    /// Total attempts including the first one (at least 1).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Factor applied to the delay for every further retry.
    pub backoff_multiplier: f64,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Fraction of random extra delay, 0.0 for exact delays.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter_ratio: 0.0,
        }
    }
}

/// Bounded retry with backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryPolicyConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryPolicyConfig {
        &self.config
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the zero-based attempt number. No attempt starts once
    /// `cancel` has fired.
    pub async fn execute<T, F, Fut>(&self, op: F, cancel: &CancellationToken) -> Outcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        self.execute_until(op, cancel, None).await
    }

    /// Like [`execute`](Self::execute), but gives up at `deadline`.
    ///
    /// A deadline that passes after at least one retryable failure yields that
    /// failure, so the caller still sees why the backend did not answer. A
    /// deadline that passes before any attempt completed yields `Expired`.
    pub async fn execute_until<T, F, Fut>(
        &self,
        mut op: F,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Outcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        let mut last_failure: Option<Failure> = None;

        let expiry = expires_at(deadline);
        tokio::pin!(expiry);

        loop {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(attempt, "Backend attempt abandoned");
                    return Outcome::Cancelled;
                }
                _ = &mut expiry => return expired(attempt, last_failure),
                outcome = op(attempt) => outcome,
            };
            attempt += 1;

            match outcome {
                Outcome::Retryable(failure) if attempt < max_attempts => {
                    let delay = calculate_backoff(attempt - 1, &self.config);
                    if deadline.is_some_and(|at| Instant::now() + delay >= at) {
                        tracing::warn!(
                            attempts = attempt,
                            delay = ?delay,
                            reason = %failure,
                            "Next retry would start after the request deadline"
                        );
                        return Outcome::Retryable(failure);
                    }

                    tracing::info!(
                        attempt,
                        max_attempts,
                        delay = ?delay,
                        reason = %failure,
                        "Retrying backend call"
                    );
                    metrics::record_retry();
                    last_failure = Some(failure);

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!(attempt, "Retry wait abandoned");
                            return Outcome::Cancelled;
                        }
                        _ = &mut expiry => return expired(attempt, last_failure),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Outcome::Retryable(failure) => {
                    tracing::warn!(attempts = attempt, reason = %failure, "Retry attempts exhausted");
                    return Outcome::Retryable(failure);
                }
                other => return other,
            }
        }
    }
}

fn expired<T>(attempts: u32, last_failure: Option<Failure>) -> Outcome<T> {
    match last_failure {
        Some(failure) => {
            tracing::warn!(attempts, reason = %failure, "Request deadline passed after failed attempts");
            Outcome::Retryable(failure)
        }
        None => {
            tracing::warn!(attempts, "Request deadline passed before the backend answered");
            Outcome::Expired
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryPolicyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Hands out pre-recorded outcomes and remembers when each call happened.
    #[derive(Clone)]
    struct Script {
        outcomes: Arc<Mutex<VecDeque<Outcome<&'static str>>>>,
        calls: Arc<Mutex<Vec<Instant>>>,
    }

    impl Script {
        fn new(outcomes: Vec<Outcome<&'static str>>) -> Self {
            Self {
                outcomes: Arc::new(Mutex::new(outcomes.into())),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        async fn call(&self) -> Outcome<&'static str> {
            self.calls.lock().unwrap().push(Instant::now());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("script ran out of outcomes")
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls.lock().unwrap();
            calls.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    fn unavailable(reason: &str) -> Outcome<&'static str> {
        Outcome::Retryable(Failure::status(StatusCode::SERVICE_UNAVAILABLE, reason))
    }

    fn approx(actual: Duration, expected: Duration) -> bool {
        actual >= expected && actual < expected + Duration::from_millis(5)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let script = Script::new(vec![unavailable("first"), unavailable("second"), Outcome::Success("ok")]);
        let policy = RetryPolicy::default();

        let outcome = policy.execute(|_| script.call(), &CancellationToken::new()).await;

        assert_eq!(outcome, Outcome::Success("ok"));
        assert_eq!(script.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_retryable_failure() {
        let script = Script::new(vec![
            unavailable("first"),
            unavailable("second"),
            unavailable("third"),
            Outcome::Success("never reached"),
        ]);
        let policy = RetryPolicy::default();

        let outcome = policy.execute(|_| script.call(), &CancellationToken::new()).await;

        assert_eq!(outcome, unavailable("third"));
        assert_eq!(script.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_is_never_retried() {
        let bad_request = Outcome::NonRetryable(Failure::status(StatusCode::BAD_REQUEST, "bad input"));
        let script = Script::new(vec![bad_request.clone(), Outcome::Success("never reached")]);

        let outcome = RetryPolicy::default()
            .execute(|_| script.call(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, bad_request);
        assert_eq!(script.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delays_grow_exponentially() {
        let script = Script::new(vec![unavailable("a"), unavailable("b"), unavailable("c")]);

        RetryPolicy::default()
            .execute(|_| script.call(), &CancellationToken::new())
            .await;

        let gaps = script.gaps();
        assert_eq!(gaps.len(), 2);
        assert!(approx(gaps[0], Duration::from_secs(2)), "first gap {:?}", gaps[0]);
        assert!(approx(gaps[1], Duration::from_secs(4)), "second gap {:?}", gaps[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn passes_attempt_numbers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let policy = RetryPolicy::new(RetryPolicyConfig {
            max_attempts: 4,
            ..RetryPolicyConfig::default()
        });

        let outcome: Outcome<()> = policy
            .execute(
                |attempt| {
                    seen.lock().unwrap().push(attempt);
                    async { Outcome::Retryable(Failure::connect("refused")) }
                },
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(outcome, Outcome::Retryable(_)));
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_stops_retries() {
        let script = Script::new(vec![unavailable("first"), Outcome::Success("never reached")]);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        };
        let (outcome, _) = tokio::join!(
            policy.execute(|_| script.call(), &cancel),
            canceller
        );

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(script.call_count(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_in_flight_attempt() {
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let canceller = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        };
        let slow = |_: u32| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Outcome::Success("too late")
        };
        let (outcome, _) = tokio::join!(policy.execute(slow, &cancel), canceller);

        assert_eq!(outcome, Outcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn already_cancelled_makes_no_calls() {
        let script = Script::new(vec![Outcome::Success("never reached")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = RetryPolicy::default().execute(|_| script.call(), &cancel).await;

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(script.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_after_failure_reports_that_failure() {
        let policy = RetryPolicy::default();
        let start = Instant::now();
        let deadline = start + Duration::from_secs(5);
        let calls = Arc::new(Mutex::new(0));

        let outcome: Outcome<()> = policy
            .execute_until(
                |_| {
                    *calls.lock().unwrap() += 1;
                    async {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        Outcome::Retryable(Failure::timeout("no response within 2s"))
                    }
                },
                &CancellationToken::new(),
                Some(deadline),
            )
            .await;

        assert_eq!(outcome, Outcome::Retryable(Failure::timeout("no response within 2s")));
        assert_eq!(*calls.lock().unwrap(), 2);
        assert!(approx(start.elapsed(), Duration::from_secs(5)), "{:?}", start.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_past_deadline_is_not_started() {
        let script = Script::new(vec![unavailable("first"), Outcome::Success("never reached")]);
        let start = Instant::now();

        let outcome = RetryPolicy::default()
            .execute_until(
                |_| script.call(),
                &CancellationToken::new(),
                Some(start + Duration::from_secs(1)),
            )
            .await;

        assert_eq!(outcome, unavailable("first"));
        assert_eq!(script.call_count(), 1);
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_before_any_answer_is_expired() {
        let start = Instant::now();
        let slow = |_: u32| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Outcome::Success("too late")
        };

        let outcome = RetryPolicy::default()
            .execute_until(slow, &CancellationToken::new(), Some(start + Duration::from_secs(3)))
            .await;

        assert_eq!(outcome, Outcome::Expired);
        assert!(approx(start.elapsed(), Duration::from_secs(3)), "{:?}", start.elapsed());
    }
}
