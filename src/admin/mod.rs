//! Admin API.
//!
//! Served on its own listener so it stays reachable while the inference
//! route is failing fast. Every route requires `Authorization: Bearer <key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::resilience::CircuitBreaker;

use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the admin handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub breaker: Arc<CircuitBreaker>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(breaker: Arc<CircuitBreaker>, api_key: &str) -> Self {
        Self {
            breaker,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breaker", get(get_breaker))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
