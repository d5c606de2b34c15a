/// Unified error types for Examflow
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the server can surface
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing, malformed, or expired credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated but not allowed: wrong role, not the owner, or a
    /// different assigned examiner
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Bad payload: missing fields, disallowed file type, oversized
    /// upload, empty required comment
    #[error("Validation error: {0}")]
    Validation(String),

    /// The paper's current status does not permit the requested action
    #[error("Invalid transition: {action} not permitted from status {current}")]
    InvalidTransition { action: String, current: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency check failed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Document store failure (retryable)
    #[error("Document storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Current paper status, included on InvalidTransition so the
    /// caller can reconcile its view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, current_status) = match &self {
            AppError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
                None,
            ),
            AppError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string(), None)
            }
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
                None,
            ),
            AppError::InvalidTransition { current, .. } => (
                StatusCode::CONFLICT,
                "InvalidTransition",
                self.to_string(),
                Some(current.clone()),
            ),
            AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NotFound", self.to_string(), None)
            }
            AppError::Conflict(_) => {
                (StatusCode::CONFLICT, "Conflict", self.to_string(), None)
            }
            AppError::Storage(_) => (
                StatusCode::BAD_GATEWAY,
                "StorageFailure",
                self.to_string(),
                None,
            ),
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                // Internals stay out of the response body
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            current_status,
        });

        (status, body).into_response()
    }
}

/// Result type alias for server operations
pub type AppResult<T> = Result<T, AppError>;
