//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Body of every failed response: `{"status": "fail" | "error", "message": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { .. } => "not_found",
            AppError::BadRequest { .. } => "bad_request",
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status();
        let error_code = self.code();

        let body = match self {
            AppError::Validation { message }
            | AppError::NotFound { message }
            | AppError::BadRequest { message } => {
                tracing::warn!(
                    error_id = %error_id,
                    error_code,
                    status_code = status.as_u16(),
                    %message,
                    "request rejected"
                );
                ErrorBody {
                    status: "fail",
                    message,
                }
            }
            AppError::MethodNotAllowed => {
                tracing::warn!(
                    error_id = %error_id,
                    error_code,
                    status_code = status.as_u16(),
                    "request rejected"
                );
                ErrorBody {
                    status: "fail",
                    message: "method not allowed".to_string(),
                }
            }
            AppError::Internal(e) => {
                tracing::error!(
                    error_id = %error_id,
                    error_code,
                    status_code = status.as_u16(),
                    error = ?e,
                    "request failed"
                );
                // Internal details stay in the logs for release builds.
                let message = if cfg!(debug_assertions) {
                    e.to_string()
                } else {
                    "an internal server error occurred".to_string()
                };
                ErrorBody {
                    status: "error",
                    message,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
