//! Timeout enforcement.
//!
//! # Responsibilities
//! - Turn the overall per-request timeout into an absolute deadline
//! - Provide the expiry future the retry loop races its attempts and waits against
//!
//! # Design Decisions
//! - The deadline never cancels the request token; the token is reserved for
//!   shutdown, so the breaker can tell "gateway going away" from "backend too slow"
//! - A deadline that passes after a failed attempt reports that failure;
//!   one that passes before any answer returns 504 Gateway Timeout

use std::time::Duration;

use tokio::time::Instant;

/// Absolute deadline `timeout` from now.
pub fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout
}

/// Resolve at `deadline`, or never when there is none.
pub async fn expires_at(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
