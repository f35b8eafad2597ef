//! API error types and conversions

use crate::dispatch::DispatchError;
use crate::notifier::Platform;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Request-level failures surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body could not be read as a notification request.
    #[error("Invalid request body: {0}")]
    MalformedBody(String),
    /// The dispatcher rejected the request before sending anything.
    #[error(transparent)]
    Rejected(DispatchError),
    /// No route matched.
    #[error("Endpoint not found")]
    NotFound,
}

/// Standard error response format
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_platforms: Option<Vec<Platform>>,
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Rejected(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MalformedBody(_) | ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        };
        let available_platforms = match &self {
            ApiError::Rejected(err) => err.available_platforms().map(<[Platform]>::to_vec),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            available_platforms,
        };

        tracing::debug!(status = %status, error = %body.error, "Returning API error");
        (status, Json(body)).into_response()
    }
}
