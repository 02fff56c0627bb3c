/// Unified error types for the tour server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the tour server
#[derive(Error, Debug)]
pub enum TourError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed request input
    #[error("{0}")]
    Validation(String),

    /// Uploaded file at or over the configured size limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Not found errors
    #[error("{0}")]
    NotFound(String),

    /// Conflict errors (e.g., blob name already taken)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TourError {
    /// Stable label used for the error metric and the response `error` field
    pub fn code(&self) -> &'static str {
        match self {
            TourError::Validation(_) => "InvalidRequest",
            TourError::PayloadTooLarge(_) => "PayloadTooLarge",
            TourError::NotFound(_) => "NotFound",
            TourError::Conflict(_) => "Conflict",
            TourError::Database(_)
            | TourError::BlobStorage(_)
            | TourError::Serialization(_)
            | TourError::Io(_)
            | TourError::Config(_)
            | TourError::Internal(_) => "InternalServerError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            TourError::Validation(_) => StatusCode::BAD_REQUEST,
            TourError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            TourError::NotFound(_) => StatusCode::NOT_FOUND,
            TourError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert TourError to HTTP response
impl IntoResponse for TourError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            crate::metrics::record_error(self.code());
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for tour server operations
pub type TourResult<T> = Result<T, TourError>;
