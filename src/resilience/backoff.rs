//! Exponential backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

use crate::resilience::retries::RetryPolicyConfig;

/// Delay before the retry that follows attempt `retry_index` (0-based).
///
/// `base_delay * backoff_multiplier^retry_index`, capped at `max_delay`, plus
/// up to `jitter_ratio` of extra random delay.
pub fn calculate_backoff(retry_index: u32, config: &RetryPolicyConfig) -> Duration {
    let exponent = i32::try_from(retry_index).unwrap_or(i32::MAX);
    let raw = config.base_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    let capped = raw.min(config.max_delay.as_secs_f64()).max(0.0);

    let jitter = if config.jitter_ratio > 0.0 {
        capped * rand::thread_rng().gen_range(0.0..=config.jitter_ratio)
    } else {
        0.0
    };

    Duration::from_secs_f64(capped + jitter)
}
