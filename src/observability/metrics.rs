//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_backend_attempts_total` (counter): backend attempts by outcome
//! - `gateway_backend_attempt_duration_seconds` (histogram): latency per attempt
//! - `gateway_retries_total` (counter): retries scheduled
//! - `gateway_breaker_rejections_total` (counter): calls failed fast by the breaker
//! - `gateway_breaker_state` (gauge): 0=closed, 1=open, 2=half-open

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(status: u16, started: Instant) {
    counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
    histogram!("gateway_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_attempt(outcome: &'static str, started: Instant) {
    counter!("gateway_backend_attempts_total", "outcome" => outcome).increment(1);
    histogram!("gateway_backend_attempt_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_retry() {
    counter!("gateway_retries_total").increment(1);
}

pub fn record_breaker_rejection() {
    counter!("gateway_breaker_rejections_total").increment(1);
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!("gateway_breaker_state", "breaker" => breaker.to_string()).set(value);
}
