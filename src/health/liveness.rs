//! Gateway liveness probe.

use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

pub const LIVENESS_STATUS: &str = "Gateway Healthy";

#[derive(Debug, Clone, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

impl Liveness {
    pub fn now() -> Self {
        Self {
            status: LIVENESS_STATUS,
            timestamp: Utc::now(),
        }
    }
}

fn rfc3339<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// `GET /api/inference/health`
pub async fn liveness() -> Json<Liveness> {
    Json(Liveness::now())
}
