//! Inference Gateway
//!
//! Forwards client inference requests to a single prediction backend,
//! shielding clients from transient backend failures.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────────┐
//!                      │                  INFERENCE GATEWAY                     │
//!                      │                                                        │
//!   POST /api/inference│  ┌──────────┐   ┌──────────┐   ┌─────────┐   ┌──────┐ │
//!   ───────────────────┼─▶│  http    │──▶│ circuit  │──▶│  retry  │──▶│caller│─┼──▶ Backend
//!                      │  │ proxy    │   │ breaker  │   │ policy  │   │      │ │    /predict
//!   ◀──────────────────┼──│ handler  │◀──│          │◀──│         │◀──│      │◀┼───
//!                      │  └──────────┘   └──────────┘   └─────────┘   └──────┘ │
//!                      │                                                        │
//!   GET /api/inference/health → liveness (never touches the backend)            │
//!                      │                                                        │
//!                      │  config · observability · lifecycle · admin            │
//!                      └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use inference_gateway::config::loader::{apply_env_overrides, finalize};
use inference_gateway::config::{load_config, GatewayConfig};
use inference_gateway::lifecycle::startup;
use inference_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "inference-gateway", version)]
#[command(about = "Resilient gateway in front of an inference backend", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = GatewayConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            finalize(config)?
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "inference-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.base_url,
        attempt_timeout_secs = config.timeouts.attempt_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
