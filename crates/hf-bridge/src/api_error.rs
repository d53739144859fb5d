//! HTTP API error types.
//!
//! Every handler failure becomes a JSON body `{"error": "..."}` with the
//! matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use hf_core::flags::FlagError;
use hf_core::monitor::MonitorError;

/// Errors that can occur in the HTTP API layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No route or resource by that name.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed or out of range.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A command or file operation failed.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<FlagError> for ApiError {
    fn from(e: FlagError) -> Self {
        ApiError::InternalError(e.to_string())
    }
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::OutOfRange(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
