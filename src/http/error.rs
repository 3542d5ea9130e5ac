//! API error responses.
//!
//! Every handler failure converges on [`ApiError`], so both services answer
//! with the same `{"message": ...}` JSON shape regardless of which route
//! failed. Server-side failures are masked in the body and logged instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("notification delivery failed")]
    DeliveryFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::DeliveryFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let message = match self {
            ApiError::Validation(message) => message,
            ApiError::NotFound(resource) => format!("{resource} not found"),
            ApiError::Storage(_) | ApiError::DeliveryFailed => "internal server error".to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
