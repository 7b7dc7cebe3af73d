//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn validated configuration into the resilience pipeline
//! - Start background pieces (metrics exporter, admin API, signal listener)
//! - Bind the inference listener last and serve until shutdown

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::backend::{BackendError, HttpBackendCaller};
use crate::config::{ConfigError, GatewayConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::resilience::{CircuitBreaker, ResiliencePipeline, RetryPolicy};

/// Fatal errors while bringing the gateway up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build the breaker-wrapped pipeline for the configured backend.
pub fn build_pipeline(config: &GatewayConfig) -> Result<ResiliencePipeline, StartupError> {
    let caller = HttpBackendCaller::new(&config.backend.base_url, &config.backend.predict_path)?;
    let breaker = Arc::new(CircuitBreaker::new(
        caller.endpoint().to_string(),
        config.circuit_breaker.breaker(),
    ));

    tracing::info!(
        endpoint = %caller.endpoint(),
        max_attempts = config.retries.max_attempts,
        failure_threshold = config.circuit_breaker.failure_threshold,
        cooldown_secs = config.circuit_breaker.cooldown_secs,
        "Resilience pipeline ready"
    );

    Ok(ResiliencePipeline::new(
        Arc::new(caller),
        RetryPolicy::new(config.retries.policy()),
        breaker,
        config.timeouts.attempt(),
    ))
}

/// Bind a TCP listener, naming the address on failure.
pub async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

fn parse_addr(address: &str) -> Result<SocketAddr, StartupError> {
    address.parse().map_err(|source| StartupError::Address {
        address: address.to_string(),
        source,
    })
}

/// Run the gateway until a termination signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    let pipeline = Arc::new(build_pipeline(&config)?);

    if config.observability.metrics_enabled {
        metrics::init_metrics(parse_addr(&config.observability.metrics_address)?)?;
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let router = setup_admin_router(AdminState::new(
            pipeline.breaker().clone(),
            &config.admin.api_key,
        ));
        let admin_shutdown = shutdown.clone();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { admin_shutdown.wait().await })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let listener = bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, pipeline, shutdown);
    server.run(listener).await.map_err(StartupError::Serve)
}
