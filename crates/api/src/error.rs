//! Application-level error type and the error envelope builder.
//!
//! Every user-visible failure flows through [`error_response`] so the
//! `{error: {code, message}, meta: {timestamp, path, correlationId}}`
//! envelope and the stable string codes stay consistent across handlers
//! and middleware.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use vitrine_core::breaker::CircuitOpen;
use vitrine_core::error::CoreError;
use vitrine_search::SearchError;

use crate::response::{ErrorBody, ErrorMeta, ErrorResponse};

/// Errors a handler or pipeline stage can surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `vitrine_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An engine adapter error.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// A fail-fast rejection from an open circuit.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpen),

    /// A database error from sqlx. These are normally absorbed inside the
    /// pipeline; one reaching the handler is an internal error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for pipeline return values.
pub type AppResult<T> = Result<T, AppError>;

/// The stable error code for a status, per the public API contract.
pub fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::REQUEST_TIMEOUT => "REQUEST_TIMEOUT",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
        StatusCode::TOO_MANY_REQUESTS => "RATE_LIMIT_EXCEEDED",
        StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
        StatusCode::GATEWAY_TIMEOUT => "GATEWAY_TIMEOUT",
        _ => "INTERNAL_ERROR",
    }
}

impl AppError {
    /// Map the error onto an HTTP status and a client-safe message.
    /// Internal details are logged here, never sent to the client.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
                CoreError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
                CoreError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal error occurred".to_string(),
                    )
                }
            },
            AppError::Search(err) if err.is_timeout() => {
                tracing::warn!(error = %err, "Engine call timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "Search engine timed out".to_string(),
                )
            }
            AppError::Search(err) => {
                tracing::error!(error = %err, "Engine call failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Search engine unavailable".to_string(),
                )
            }
            AppError::CircuitOpen(open) => {
                tracing::warn!(breaker = %open.0, "Failing fast, circuit open");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Search engine unavailable".to_string(),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error reached the handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

/// Build the error envelope for a failed request.
pub fn error_response(err: AppError, correlation_id: Option<&str>, path: &str) -> Response {
    let (status, message) = err.status_and_message();
    envelope(status, message, correlation_id, path)
}

/// Build an error envelope directly from a status and message (used by
/// middleware and the not-found fallback).
pub fn envelope(
    status: StatusCode,
    message: String,
    correlation_id: Option<&str>,
    path: &str,
) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            code: code_for_status(status).to_string(),
            message,
            details: None,
        },
        meta: ErrorMeta {
            timestamp: chrono::Utc::now(),
            path: path.to_string(),
            correlation_id: correlation_id.map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}
