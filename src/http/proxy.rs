//! Inference proxy handler.
//!
//! # Responsibilities
//! - Reject malformed JSON before the pipeline runs
//! - Bound the whole request by the overall deadline
//! - Hand the payload to the resilience pipeline
//! - Translate the result into the client response

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::de::IgnoredAny;

use crate::backend::{BackendResponse, InferenceRequest, X_REQUEST_ID};
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::{deadline_after, GatewayError};

/// `POST /api/inference`
pub async fn predict(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();
    let id = request_id(&headers);

    let response = match forward(&state, &headers, body).await {
        Ok(answer) => {
            tracing::info!(request_id = %id, status = answer.status.as_u16(), "Inference served");
            answer.into_response()
        }
        Err(e) => {
            match &e {
                GatewayError::InvalidPayload(_) => {
                    tracing::debug!(request_id = %id, error = %e, "Rejected inference payload")
                }
                _ => tracing::warn!(request_id = %id, code = e.code(), error = %e, "Inference failed"),
            }
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), started);
    response
}

async fn forward(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<BackendResponse, GatewayError> {
    serde_json::from_slice::<IgnoredAny>(&body).map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

    let request = InferenceRequest {
        body,
        content_type: headers.get(CONTENT_TYPE).cloned(),
        request_id: headers.get(X_REQUEST_ID).cloned(),
    };

    let cancel = state.shutdown.subscribe();
    let deadline = deadline_after(state.request_deadline);
    state.pipeline.forward_until(&request, &cancel, Some(deadline)).await
}
