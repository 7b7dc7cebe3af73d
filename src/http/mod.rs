//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing span, body limit)
//!     → proxy.rs (payload check, deadline, resilience pipeline)
//!     → response.rs (backend answer or gateway error → HTTP response)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, GatewayRequestId};
pub use server::{AppState, HttpServer};
