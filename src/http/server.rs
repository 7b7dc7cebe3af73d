//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the inference and liveness handlers
//! - Wire up middleware (request ID, tracing, body limit)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::health;
use crate::http::proxy;
use crate::http::request::{request_id, GatewayRequestId};
use crate::lifecycle::Shutdown;
use crate::resilience::ResiliencePipeline;

pub const INFERENCE_PATH: &str = "/api/inference";
pub const LIVENESS_PATH: &str = "/api/inference/health";

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<ResiliencePipeline>,
    pub request_deadline: Duration,
    pub shutdown: Shutdown,
}

/// HTTP server for the inference gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server around an existing pipeline.
    pub fn new(config: GatewayConfig, pipeline: Arc<ResiliencePipeline>, shutdown: Shutdown) -> Self {
        let state = AppState {
            pipeline,
            request_deadline: config.timeouts.request(),
            shutdown: shutdown.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route(INFERENCE_PATH, post(proxy::predict))
            .route(LIVENESS_PATH, get(health::liveness))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(GatewayRequestId))
    }

    /// A copy of the router, for serving on a custom listener or in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until shutdown is triggered and in-flight requests drain.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.base_url,
            "HTTP server starting"
        );

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
