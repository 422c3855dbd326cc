//! Error Types for DEPOT API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Every error is rendered as the JSON envelope
//! `{"status":"error","error":"<message>","code":"<CODE>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use depot_core::{DepotError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::ErrorEnvelope;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each code maps to one HTTP status code and one domain [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 404, 409)
    // ========================================================================
    /// Path segment, version label or pagination token is malformed
    InvalidInput,

    /// Object, version or channel pointer does not exist
    NotFound,

    /// Version already exists and the publish did not promote
    VersionConflict,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    /// Non-retryable store failure
    InternalError,

    /// Retryable store failure after the retry budget ran out
    UpstreamUnavailable,

    /// Upstream call exceeded its deadline
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::VersionConflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::NotFound => "Object not found",
            ErrorCode::VersionConflict => "Version already exists",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::UpstreamUnavailable => "Upstream temporarily unavailable",
            ErrorCode::Timeout => "Operation timed out",
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Conflict => ErrorCode::VersionConflict,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::UpstreamUnavailable => ErrorCode::UpstreamUnavailable,
            ErrorKind::Terminal => ErrorCode::InternalError,
            ErrorKind::Malformed => ErrorCode::InvalidInput,
            ErrorKind::Timeout => ErrorCode::Timeout,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by every handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// Domain errors keep their message; the code follows [`DepotError::kind`].
impl From<DepotError> for ApiError {
    fn from(err: DepotError) -> Self {
        let code = ErrorCode::from(err.kind());
        if code.status_code().is_server_error() {
            tracing::error!(error = %err, code = %code, "Request failed");
        } else {
            tracing::debug!(error = %err, code = %code, "Request rejected");
        }
        ApiError::new(code, err.to_string())
    }
}

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
///
/// This allows ApiError to be returned directly from Axum handlers:
/// ```ignore
/// async fn handler() -> Result<Json<ApiResponse>, ApiError> {
///     Err(ApiError::invalid_input("bad token"))
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorEnvelope::new(self.message, Some(self.code)));
        (status, body).into_response()
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use depot_core::{Channel, StoreError};

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::VersionConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::UpstreamUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_domain_errors_map_by_kind() {
        let conflict = ApiError::from(DepotError::Conflict {
            path: "team/app.bin".into(),
            version: "v1".into(),
        });
        assert_eq!(conflict.code, ErrorCode::VersionConflict);
        assert!(conflict.message.contains("already exists"));

        let unset = ApiError::from(DepotError::PointerNotSet {
            path: "team/app.bin".into(),
            channel: Channel::Dev,
        });
        assert_eq!(unset.status_code(), StatusCode::NOT_FOUND);

        let exhausted = ApiError::from(DepotError::MetadataRead {
            path: "team/app.bin".into(),
            source: StoreError::Throttled { reason: "slow down".into() },
        });
        assert_eq!(exhausted.code, ErrorCode::UpstreamUnavailable);

        let terminal = ApiError::from(DepotError::ContentWrite {
            path: "team/app.bin".into(),
            version: "v1".into(),
            source: StoreError::backend("AccessDenied"),
        });
        assert_eq!(terminal.code, ErrorCode::InternalError);

        let timeout = ApiError::from(DepotError::Timeout {
            operation: "get".into(),
            after: Duration::from_secs(30),
        });
        assert_eq!(timeout.code, ErrorCode::Timeout);

        let malformed = ApiError::from(DepotError::malformed("token", "outside listing"));
        assert_eq!(malformed.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_remote_message_relayed_verbatim() {
        let err = ApiError::from(DepotError::Remote {
            status: 404,
            message: "No prod version set for object team/app.bin".into(),
        });
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "No prod version set for object team/app.bin");
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::internal_error("Connection failed");
        let display = format!("{}", err);

        assert!(display.contains("InternalError"));
        assert!(display.contains("Connection failed"));
    }

    #[test]
    fn test_from_code_uses_default_message() {
        let err = ApiError::from_code(ErrorCode::Timeout);
        assert_eq!(err.message, "Operation timed out");
    }
}
