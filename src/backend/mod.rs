//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! InferenceRequest (opaque bytes + content type)
//!     → caller.rs (one POST to base_url + predict_path, bounded by attempt timeout)
//!     → Outcome<BackendResponse> (success / retryable / non-retryable)
//! ```
//!
//! # Design Decisions
//! - A single backend address from configuration; no discovery
//! - The payload is never parsed here
//! - `BackendCaller` is a trait so the resilience layers can be tested without a network

pub mod caller;

pub use caller::{
    classify, BackendCaller, BackendError, BackendResponse, HttpBackendCaller, InferenceRequest,
    X_REQUEST_ID,
};
