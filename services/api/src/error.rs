//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use job_ledger_core::ports::PortError;
use tracing::error;

use crate::config::ConfigError;
use crate::web::rest::ApiResponse;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure to apply the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request payload failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, malformed or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    /// Status code plus the client-facing message and error code.
    fn parts(&self) -> (StatusCode, String, &'static str) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation_error"),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), "unauthorized"),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), "forbidden"),
            ApiError::Port(PortError::Invalid(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "validation_error")
            }
            ApiError::Port(PortError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, msg.clone(), "not_found")
            }
            ApiError::Port(PortError::Conflict(msg)) => {
                (StatusCode::CONFLICT, msg.clone(), "conflict")
            }
            ApiError::Port(PortError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, msg.clone(), "forbidden")
            }
            ApiError::Port(PortError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials".to_string(),
                "unauthorized",
            ),
            // Internal details stay in the logs.
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
                "internal_error",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = self.parts();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body: ApiResponse<()> = ApiResponse::failure(message, code);
        (status, Json(body)).into_response()
    }
}
