//! HTTP request handlers.
//!
//! # Endpoints
//!
//! - `POST /callback`, `POST /platforms/line/callback` - LINE webhook
//! - `POST /platforms/telegram/callback` - Telegram webhook
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::dispatch::{DispatchSummary, Dispatcher};
use crate::error::{DispatchError, PipelineError};
use crate::platform::Platform;

// =============================================================================
// Application State
// =============================================================================

/// State for a webhook route: the shared dispatcher plus the platform that
/// owns the route.
pub struct WebhookState {
    /// Shared dispatcher
    pub dispatcher: Arc<Dispatcher>,

    /// Platform receiving on this route
    pub platform: Arc<dyn Platform>,
}

impl WebhookState {
    pub fn new(dispatcher: Arc<Dispatcher>, platform: Arc<dyn Platform>) -> Self {
        Self {
            dispatcher,
            platform,
        }
    }
}

impl Clone for WebhookState {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            platform: Arc::clone(&self.platform),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_input", "storage_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Status code and error type for a dispatch failure.
pub fn dispatch_error_status(err: &DispatchError) -> (StatusCode, &'static str) {
    match err {
        DispatchError::InvalidSignature { status, .. } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::UNAUTHORIZED),
            "invalid_signature",
        ),
        DispatchError::Parse { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "malformed_payload"),
        DispatchError::Pipeline(PipelineError::InvalidInput { .. }) => {
            (StatusCode::BAD_REQUEST, "invalid_input")
        }
        DispatchError::Pipeline(PipelineError::Render(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "render_error")
        }
        DispatchError::Pipeline(PipelineError::Encode(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
        }
        DispatchError::Pipeline(PipelineError::Storage(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
        }
        DispatchError::Pipeline(PipelineError::Task { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "task_error")
        }
        DispatchError::Reply { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "reply_failed"),
        DispatchError::Timeout { .. } => (StatusCode::SERVICE_UNAVAILABLE, "timeout"),
    }
}

/// Convert DispatchError to HTTP response.
///
/// The dispatcher has already logged the failure with its context; this only
/// records the status that goes back to the platform.
impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, error_type) = dispatch_error_status(&self);
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Webhook failed"
            );
        } else if status.is_client_error() {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Webhook rejected"
            );
        } else {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Webhook accepted as no-op"
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle a webhook delivery for the route's platform.
///
/// # Response
///
/// - `200 OK` with a [`DispatchSummary`] when every text event was replied to
/// - the platform's no-op status (LINE: `200`, Telegram: `401`) on an invalid
///   signature
/// - `400 Bad Request` for empty message text
/// - `500 Internal Server Error` for malformed payloads and render, storage or
///   reply failures
/// - `503 Service Unavailable` when the deadline expires
pub async fn webhook_handler(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DispatchSummary>, DispatchError> {
    let summary = state
        .dispatcher
        .dispatch(state.platform.as_ref(), &body, &headers)
        .await?;

    Ok(Json(summary))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
