//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/inference/health
//!     → liveness.rs (constant status + current UTC timestamp)
//! ```
//!
//! # Design Decisions
//! - Liveness reflects the gateway process only; it never touches the backend
//!   or the circuit breaker, so it answers even while the backend is down
//! - Breaker state is exposed separately through the admin API

pub mod liveness;

pub use liveness::{liveness, Liveness, LIVENESS_STATUS};
