//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{DomainError, ErrorCode, ErrorKind};

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Domain(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::BusinessRule => StatusCode::CONFLICT,
                ErrorKind::Database => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => ErrorResponse {
                error: "Invalid request".to_string(),
                error_code: "INVALID_REQUEST".to_string(),
                details: Some(msg.clone()),
            },

            // 500, never leak store details
            AppError::Domain(DomainError::Database(msg)) => {
                tracing::error!("Database error: {}", msg);
                ErrorResponse {
                    error: ErrorCode::DatabaseError.message().to_string(),
                    error_code: ErrorCode::DatabaseError.as_str().to_string(),
                    details: None,
                }
            }

            AppError::Domain(domain_err) => {
                let details = match domain_err {
                    DomainError::Validation { detail, .. } => detail.clone(),
                    _ => None,
                };
                ErrorResponse {
                    error: domain_err.code().message().to_string(),
                    error_code: domain_err.code().as_str().to_string(),
                    details,
                }
            }

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    error_code: "INTERNAL_ERROR".to_string(),
                    details: None,
                }
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    error_code: "CONFIG_ERROR".to_string(),
                    details: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

// =========================================================================
// Extractor rejections
// =========================================================================

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}
