//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first call after the cooldown elapsed (lazy, no timer task)
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails
//! ```
//!
//! # Design Decisions
//! - One breaker per backend, owned by the application state (not global)
//! - Fail fast in Open state (no network, no retry work)
//! - Single probe in Half-Open; admission and probe claim share one critical section
//! - A cancelled or expired call is not evidence about backend health and leaves counters alone

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::outcome::{BreakerOpen, Outcome};

/// Current state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Immutable breaker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed executions that open the circuit (at least 1).
    pub failure_threshold: u32,
    /// Time the circuit stays open before a probe is let through.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Point-in-time view of the breaker, for tests and the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Closed,
    Probe,
}

/// Circuit breaker guarding one backend target.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state without triggering the lazy Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
        }
    }

    /// Time left until an open circuit lets a probe through.
    pub fn remaining_cooldown(&self) -> Duration {
        let inner = self.lock();
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => self.config.cooldown.saturating_sub(at.elapsed()),
            _ => Duration::ZERO,
        }
    }

    /// Run `op` unless the circuit rejects the call.
    ///
    /// Success resets the failure count; retryable and non-retryable failures
    /// both count against the threshold.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<Outcome<T>, BreakerOpen>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        let permit = self.admit()?;
        let outcome = op().await;
        permit.settle(&outcome);
        Ok(outcome)
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Result<Permit<'_>, BreakerOpen> {
        let mut inner = self.lock();
        let current = inner.state;
        let admission = match current {
            CircuitState::Closed => Some(Admission::Closed),
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.cooldown);
                if cooled {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.probe_in_flight = true;
                    Some(Admission::Probe)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen if inner.probe_in_flight => None,
            CircuitState::HalfOpen => {
                inner.probe_in_flight = true;
                Some(Admission::Probe)
            }
        };
        drop(inner);

        match admission {
            Some(admission) => Ok(Permit {
                breaker: self,
                admission,
                settled: false,
            }),
            None => {
                tracing::debug!(breaker = %self.name, "Circuit open, rejecting call");
                metrics::record_breaker_rejection();
                Err(BreakerOpen)
            }
        }
    }

    fn record<T>(&self, admission: Admission, outcome: &Outcome<T>) {
        let mut inner = self.lock();
        match (admission, outcome) {
            (Admission::Closed, Outcome::Success(_)) => {
                if inner.state == CircuitState::Closed {
                    inner.consecutive_failures = 0;
                }
            }
            (Admission::Closed, Outcome::Retryable(_) | Outcome::NonRetryable(_)) => {
                if inner.state == CircuitState::Closed {
                    inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        inner.opened_at = Some(Instant::now());
                        self.transition(&mut inner, CircuitState::Open);
                    }
                }
            }
            (Admission::Probe, Outcome::Success(_)) => {
                inner.probe_in_flight = false;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                self.transition(&mut inner, CircuitState::Closed);
            }
            (Admission::Probe, Outcome::Retryable(_) | Outcome::NonRetryable(_)) => {
                inner.probe_in_flight = false;
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
            }
            (Admission::Probe, Outcome::Cancelled | Outcome::Expired) => inner.probe_in_flight = false,
            (Admission::Closed, Outcome::Cancelled | Outcome::Expired) => {}
        }
    }

    fn release_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        if inner.state == to {
            return;
        }
        let from = inner.state;
        inner.state = to;
        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = from.as_str(),
                failures = inner.consecutive_failures,
                cooldown = ?self.config.cooldown,
                "Circuit opened"
            ),
            _ => tracing::info!(
                breaker = %self.name,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit state changed"
            ),
        }
        metrics::record_breaker_state(&self.name, to);
    }
}

/// Admission ticket for one call.
///
/// Dropping an unsettled probe permit (the request future was dropped, e.g.
/// on client disconnect) frees the probe slot so the next caller can probe.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl Permit<'_> {
    fn settle<T>(mut self, outcome: &Outcome<T>) {
        self.settled = true;
        self.breaker.record(self.admission, outcome);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Probe {
            self.breaker.release_probe();
        }
    }
}
