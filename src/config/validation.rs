//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and that the
//! backend address is usable. All problems are reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("backend.base_url '{value}' is not a valid URL: {reason}")]
    InvalidBackendUrl { value: String, reason: String },

    #[error("backend.base_url '{0}' must use plain http")]
    UnsupportedScheme(String),

    #[error("backend.predict_path '{0}' must start with '/'")]
    InvalidPredictPath(String),

    #[error("{field} '{value}' is not a socket address")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("retries.backoff_multiplier must be finite and >= 1.0 (got {0})")]
    InvalidMultiplier(f64),

    #[error("retries.jitter_ratio must be within 0.0..=1.0 (got {0})")]
    InvalidJitter(f64),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.backend.base_url) {
        Ok(url) if url.scheme() != "http" => {
            errors.push(ValidationError::UnsupportedScheme(config.backend.base_url.clone()));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidBackendUrl {
            value: config.backend.base_url.clone(),
            reason: e.to_string(),
        }),
    }

    if !config.backend.predict_path.starts_with('/') {
        errors.push(ValidationError::InvalidPredictPath(config.backend.predict_path.clone()));
    }

    check_bind(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_bind(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_bind(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    let nonzero = [
        ("timeouts.attempt_secs", config.timeouts.attempt_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("retries.max_attempts", u64::from(config.retries.max_attempts)),
        ("circuit_breaker.failure_threshold", u64::from(config.circuit_breaker.failure_threshold)),
        ("circuit_breaker.cooldown_secs", config.circuit_breaker.cooldown_secs),
        ("security.max_body_size", config.security.max_body_size as u64),
    ];
    for (field, value) in nonzero {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    let multiplier = config.retries.backoff_multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        errors.push(ValidationError::InvalidMultiplier(multiplier));
    }

    let jitter = config.retries.jitter_ratio;
    if !(0.0..=1.0).contains(&jitter) {
        errors.push(ValidationError::InvalidJitter(jitter));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}
