//! Backend caller: one outbound HTTP exchange per invocation.
//!
//! # Responsibilities
//! - POST the inbound payload to `base_url + predict_path`
//! - Bound the whole exchange (connect, response, body) by the attempt timeout
//! - Classify the result; never retry internally
//!
//! # Classification
//! ```text
//! 2xx                          → Success
//! 5xx, 404, timeout, I/O error → Retryable (404: backend may not be registered yet)
//! other status                 → NonRetryable
//! ```

use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::resilience::outcome::{Failure, Outcome};

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Largest backend response body the gateway will buffer.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Opaque inference payload as received from the client.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
    pub request_id: Option<HeaderValue>,
}

impl InferenceRequest {
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: Some(HeaderValue::from_static("application/json")),
            request_id: None,
        }
    }
}

/// Successful backend answer, relayed to the client unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Performs exactly one backend call.
#[async_trait]
pub trait BackendCaller: Send + Sync + std::fmt::Debug {
    async fn call(&self, request: &InferenceRequest, timeout: Duration) -> Outcome<BackendResponse>;
}

/// Construction errors; these are fatal at startup.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("backend address '{0}' must use plain http")]
    UnsupportedScheme(String),
}

#[derive(Debug, Error)]
enum ExchangeError {
    #[error("{0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("reading response body: {0}")]
    Body(#[from] axum::Error),
}

/// Map a backend response onto the outcome taxonomy.
pub fn classify(response: BackendResponse) -> Outcome<BackendResponse> {
    let status = response.status;
    if status.is_success() {
        return Outcome::Success(response);
    }

    let reason = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("status {}", status.as_u16()));
    let failure = Failure::status(status, reason);

    if status.is_server_error() || status == StatusCode::NOT_FOUND {
        Outcome::Retryable(failure)
    } else {
        Outcome::NonRetryable(failure)
    }
}

/// Backend caller over a plain HTTP/1.1 client.
///
/// Idle pooling is disabled, so each attempt opens its own connection and the
/// connection is closed with the exchange on every exit path.
#[derive(Debug, Clone)]
pub struct HttpBackendCaller {
    client: Client<HttpConnector, Body>,
    endpoint: Uri,
}

impl HttpBackendCaller {
    /// Resolve `predict_path` against `base_url`.
    pub fn new(base_url: &str, predict_path: &str) -> Result<Self, BackendError> {
        let invalid = |reason: String| BackendError::InvalidAddress {
            address: base_url.to_string(),
            reason,
        };

        let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base.scheme() != "http" {
            return Err(BackendError::UnsupportedScheme(base_url.to_string()));
        }
        let endpoint = base.join(predict_path).map_err(|e| invalid(e.to_string()))?;
        let endpoint: Uri = endpoint
            .as_str()
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| invalid(e.to_string()))?;

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    async fn exchange(&self, request: Request<Body>) -> Result<BackendResponse, ExchangeError> {
        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), MAX_RESPONSE_BYTES).await?;
        Ok(BackendResponse {
            status: parts.status,
            content_type: parts.headers.get(CONTENT_TYPE).cloned(),
            body,
        })
    }
}

#[async_trait]
impl BackendCaller for HttpBackendCaller {
    async fn call(&self, request: &InferenceRequest, timeout: Duration) -> Outcome<BackendResponse> {
        let content_type = request
            .content_type
            .clone()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, content_type);
        if let Some(id) = &request.request_id {
            builder = builder.header(X_REQUEST_ID, id.clone());
        }
        let outbound = match builder.body(Body::from(request.body.clone())) {
            Ok(req) => req,
            Err(e) => return Outcome::NonRetryable(Failure::connect(format!("building request: {}", e))),
        };

        match tokio::time::timeout(timeout, self.exchange(outbound)).await {
            Ok(Ok(response)) => classify(response),
            Ok(Err(e)) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Backend exchange failed");
                Outcome::Retryable(Failure::connect(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(endpoint = %self.endpoint, timeout = ?timeout, "Backend attempt timed out");
                Outcome::Retryable(Failure::timeout(format!("no response within {:?}", timeout)))
            }
        }
    }
}
