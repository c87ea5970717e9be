use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Error taxonomy surfaced to API clients.
///
/// Everything except `Database` and `Internal` is a client error that
/// propagates directly with no local recovery. `MalformedIdentifier` and
/// `NotFound` carry distinct codes so callers can always tell a bad
/// identifier apart from a missing record.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No or invalid credentials were presented on a protected action.
    /// The client should retry with credentials.
    #[error("authentication required")]
    Unauthenticated,

    /// Credentials were presented but the policy denies the action.
    /// Retrying will not help.
    #[error("{0}")]
    Forbidden(String),

    /// A well-formed identifier with no matching record.
    #[error("{0}")]
    NotFound(String),

    /// Input failed identifier format validation.
    #[error("'{0}' is not a valid UUID")]
    MalformedIdentifier(String),

    /// Field-level input rejected.
    #[error("{0}")]
    Validation(String),

    /// Reserved for cache invalidation failures; these fail loudly
    /// instead of leaving a stale cache behind.
    #[error("{0}")]
    Conflict(String),

    /// Unknown storage failure.
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// Unexpected failure outside the storage layer.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Map a storage error, converting unique-constraint hits into a
    /// field-level validation failure with the given message.
    pub fn from_db_unique(db_error: DbErr, message: &str) -> ApiError {
        match db_error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ApiError::Validation(message.to_string())
            }
            _ => ApiError::Database(db_error),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::MalformedIdentifier(_) => (StatusCode::BAD_REQUEST, "MALFORMED_IDENTIFIER"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Server faults are logged with full detail but rendered opaque.
        let message = if status.is_server_error() {
            error!("request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
