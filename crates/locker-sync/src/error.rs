// File: locker-sync/src/error.rs
// Purpose: Error types and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type for ingestion operations
pub type SyncResult<T> = Result<T, SyncError>;

/// A sync request that must be rejected before it reaches the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("field must not be empty: {0}")]
    EmptyField(&'static str),

    #[error("invalid timestamp in {field}: {value:?} is not RFC 3339")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("last_sync_attempt must not be negative, got {0}")]
    NegativeAttempt(i64),
}

/// Errors surfaced by the ingestion path
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never reached the reconciler
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failure reported by a SQL backend, passed through untouched
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-SQL backend
    #[error("storage error: {0}")]
    Storage(String),

    #[error("package not found: {0}")]
    NotFound(String),
}

impl SyncError {
    /// Returns true if the caller sent something wrong (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::NotFound(_))
    }

    /// Returns true if the store failed (5xx)
    pub fn is_server_error(&self) -> bool {
        matches!(self, SyncError::Database(_) | SyncError::Storage(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::Validation(_) => StatusCode::BAD_REQUEST,
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::Database(_) | SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
