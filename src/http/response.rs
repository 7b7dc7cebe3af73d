//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay a successful backend answer unchanged (status, content type, body)
//! - Map gateway errors to HTTP status codes with a JSON error body
//!
//! # Status Mapping
//! ```text
//! backend status failure  → backend status
//! connection failure      → 502 Bad Gateway
//! attempt timeout         → 504 Gateway Timeout
//! breaker open            → 503 Service Unavailable + Retry-After
//! deadline exceeded       → 504 Gateway Timeout
//! shutting down           → 503 Service Unavailable
//! invalid payload         → 400 Bad Request
//! ```

use std::time::Duration;

use axum::http::header::{CONTENT_TYPE, RETRY_AFTER};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::backend::BackendResponse;
use crate::resilience::{FailureKind, GatewayError};

/// JSON body of every gateway-generated error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl GatewayError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Transient(failure) | GatewayError::Permanent(failure) => match failure.kind {
                FailureKind::Status(status) => status,
                FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FailureKind::Connect => StatusCode::BAD_GATEWAY,
            },
            GatewayError::BreakerOpen { .. } | GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Whole seconds for `Retry-After`, rounded up and never zero.
fn retry_after_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            GatewayError::BreakerOpen { retry_after } => Some(retry_after_secs(*retry_after)),
            _ => None,
        };
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl IntoResponse for BackendResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        match self.content_type {
            Some(content_type) => {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            None => {
                response.headers_mut().remove(CONTENT_TYPE);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::Failure;
    use axum::body::{to_bytes, Bytes};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (GatewayError::Transient(Failure::status(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")), 503),
            (GatewayError::Permanent(Failure::status(StatusCode::BAD_REQUEST, "Bad Request")), 400),
            (GatewayError::Transient(Failure::status(StatusCode::NOT_FOUND, "Not Found")), 404),
            (GatewayError::Transient(Failure::connect("connection refused")), 502),
            (GatewayError::Transient(Failure::timeout("no response")), 504),
            (GatewayError::BreakerOpen { retry_after: Duration::from_secs(3) }, 503),
            (GatewayError::DeadlineExceeded, 504),
            (GatewayError::Cancelled, 503),
            (GatewayError::InvalidPayload("eof".into()), 400),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status_code().as_u16(), expected, "{error}");
        }
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(200)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(20)), 20);
        assert_eq!(retry_after_secs(Duration::from_millis(20_001)), 21);
    }

    #[tokio::test]
    async fn breaker_open_carries_retry_after() {
        let response = GatewayError::BreakerOpen {
            retry_after: Duration::from_millis(12_500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "13");
        let body = body_json(response).await;
        assert_eq!(body["error"], "circuit_open");
    }

    #[tokio::test]
    async fn error_body_names_the_code() {
        let response = GatewayError::Cancelled.into_response();
        assert!(response.headers().get(RETRY_AFTER).is_none());
        let body = body_json(response).await;
        assert_eq!(body["error"], "shutting_down");
        assert_eq!(body["message"], "request cancelled");
    }

    #[tokio::test]
    async fn backend_answer_is_relayed_unchanged() {
        let response = BackendResponse {
            status: StatusCode::CREATED,
            content_type: Some(HeaderValue::from_static("application/json")),
            body: Bytes::from_static(br#"{"label":"POSITIVE"}"#),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"label":"POSITIVE"}"#);
    }

    #[test]
    fn missing_backend_content_type_stays_missing() {
        let response = BackendResponse {
            status: StatusCode::OK,
            content_type: None,
            body: Bytes::new(),
        }
        .into_response();
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }
}
