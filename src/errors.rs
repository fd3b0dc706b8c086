//! Resource error types
//!
//! Error taxonomy for the resource pipeline, with a uniform JSON
//! rendering so every failure is forwarded to the same response channel.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Result type for resource operations
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors raised by the resource pipeline
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Operation not authorized: {operation}")]
    Authorization { operation: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Model operation failed: {message}")]
    Model { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResourceError {
    /// Create a not-found error for the named resource
    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        ResourceError::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an authorization error for the named operation
    pub fn authorization<T: Into<String>>(operation: T) -> Self {
        ResourceError::Authorization {
            operation: operation.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        ResourceError::BadRequest {
            message: message.into(),
        }
    }

    /// Create a model error
    pub fn model<T: Into<String>>(message: T) -> Self {
        ResourceError::Model {
            message: message.into(),
        }
    }

    /// Get error code for consistent API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            ResourceError::Authorization { .. } => "OPERATION_NOT_AUTHORIZED",
            ResourceError::BadRequest { .. } => "BAD_REQUEST",
            ResourceError::Model { .. } => "MODEL_ERROR",
            ResourceError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResourceError::Authorization { .. } => StatusCode::FORBIDDEN,
            ResourceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ResourceError::Model { .. } | ResourceError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "resource error: {}", self);
        } else {
            tracing::debug!(code = self.error_code(), "resource error: {}", self);
        }

        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
