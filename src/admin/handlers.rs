use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::resilience::CircuitState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct BreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Seconds since the breaker last opened; absent while closed.
    pub open_for_secs: Option<u64>,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_breaker(State(state): State<AdminState>) -> Json<BreakerStatus> {
    let breaker = &state.breaker;
    let snapshot = breaker.snapshot();

    Json(BreakerStatus {
        name: breaker.name().to_string(),
        state: snapshot.state,
        consecutive_failures: snapshot.consecutive_failures,
        open_for_secs: snapshot.opened_at.map(|at| at.elapsed().as_secs()),
        failure_threshold: breaker.config().failure_threshold,
        cooldown_secs: breaker.config().cooldown.as_secs(),
    })
}
