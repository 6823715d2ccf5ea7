//! Error types for LitGraph services
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling
//!
//! The fetch layer never surfaces individual chunk failures as errors; only
//! seed/author resolution is fatal to a build. Everything else here exists so
//! the gateway can report those fatal cases (and its own validation noise) in
//! one structured shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidIdentifier,

    // Resource errors (4xxx)
    SourceNotFound,
    AuthorNotFound,
    WorkNotFound,

    // External service errors (8xxx)
    CatalogError,
    CacheError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidIdentifier => 1002,

            // Resources (4xxx)
            ErrorCode::SourceNotFound => 4001,
            ErrorCode::AuthorNotFound => 4002,
            ErrorCode::WorkNotFound => 4003,

            // External (8xxx)
            ErrorCode::CatalogError => 8001,
            ErrorCode::CacheError => 8002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid identifier: {input}")]
    InvalidIdentifier { input: String },

    // Resource errors - the only fatal outcomes of a graph build
    #[error("could not fetch source {id}")]
    SourceNotFound { id: String },

    #[error("could not fetch author {id}")]
    AuthorNotFound { id: String },

    #[error("Work not found: {id}")]
    WorkNotFound { id: String },

    // External service errors
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            AppError::SourceNotFound { .. } => ErrorCode::SourceNotFound,
            AppError::AuthorNotFound { .. } => ErrorCode::AuthorNotFound,
            AppError::WorkNotFound { .. } => ErrorCode::WorkNotFound,
            AppError::Catalog { .. } => ErrorCode::CatalogError,
            AppError::Cache { .. } => ErrorCode::CacheError,
            AppError::HttpClient(_) => ErrorCode::CatalogError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidIdentifier { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            AppError::SourceNotFound { .. }
            | AppError::AuthorNotFound { .. }
            | AppError::WorkNotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Catalog { .. } | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::Cache { .. } | AppError::ServiceUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None, // Filled by middleware when present
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Cache {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::SourceNotFound { id: "W42".into() };
        assert_eq!(err.code(), ErrorCode::SourceNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_fatal_source_message() {
        // The user-visible wording for a failed seed fetch is fixed.
        let err = AppError::SourceNotFound { id: "W42".into() };
        assert_eq!(err.to_string(), "could not fetch source W42");
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "identifier must not be empty".into(),
            field: Some("identifier".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_catalog_error_is_bad_gateway() {
        let err = AppError::Catalog {
            message: "upstream 500".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_numeric_codes_are_grouped() {
        assert_eq!(ErrorCode::ValidationError.as_code() / 1000, 1);
        assert_eq!(ErrorCode::SourceNotFound.as_code() / 1000, 4);
        assert_eq!(ErrorCode::CatalogError.as_code() / 1000, 8);
        assert_eq!(ErrorCode::InternalError.as_code() / 1000, 9);
    }
}
