//! Stand-in prediction backend for trying the gateway locally.
//!
//! `cargo run --example mock_backend -- --fail-first 2` answers the first two
//! predictions with 503 so the gateway's retries are visible.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use clap::Parser;
use serde_json::{json, Value};

#[derive(Parser)]
struct Args {
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Answer this many predictions with 503 before recovering
    #[arg(short, long, default_value_t = 0)]
    fail_first: u32,
}

#[derive(Clone)]
struct Flaky {
    remaining_failures: Arc<AtomicU32>,
}

async fn predict(State(flaky): State<Flaky>, Json(input): Json<Value>) -> (StatusCode, Json<Value>) {
    let failing = flaky
        .remaining_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "model loading" })),
        );
    }

    let text = input["text"].as_str().unwrap_or_default();
    let label = if text.to_lowercase().contains("love") { "POSITIVE" } else { "NEGATIVE" };
    (StatusCode::OK, Json(json!({ "label": label, "score": 0.98 })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let state = Flaky {
        remaining_failures: Arc::new(AtomicU32::new(args.fail_first)),
    };
    let app = Router::new().route("/predict", post(predict)).with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    println!("Mock prediction backend listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
