//! Error types for publish-all
//!
//! This module provides error handling for the library, including:
//! - The main [`Error`] type and the [`Result`] alias
//! - [`ValidationError`], raised before a job is dispatched
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for publish-all operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for publish-all
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "targets.tumblr")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Job rejected before dispatch
    #[error("invalid job: {0}")]
    Validation(#[from] ValidationError),

    /// Job or resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Target identifier is not one of the known platforms
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// Target is a known platform but has no credentials configured
    #[error("target not configured: {0}")]
    TargetNotConfigured(String),

    /// A platform rejected a publish call
    #[error("{target} error: {message}")]
    Platform {
        /// Target identifier of the platform that failed
        target: String,
        /// HTTP status returned by the platform, if any
        status: Option<u16>,
        /// Message extracted from the platform response
        message: String,
    },

    /// Image hosting upload failed
    #[error("image upload failed: {0}")]
    ImageUpload(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Platform`] for the given target
    pub fn platform(
        target: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Error::Platform {
            target: target.into(),
            status,
            message: message.into(),
        }
    }
}

/// Structural problems with a job, detected before any side effect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The job names no targets
    #[error("at least one target is required")]
    NoTargets,

    /// A target identifier is blank
    #[error("target at position {index} is empty")]
    EmptyTarget {
        /// Position of the blank identifier in the target list
        index: usize,
    },

    /// The same target is listed more than once
    #[error("target {0} is listed more than once")]
    DuplicateTarget(String),

    /// A target identifier collides with a name used for internal records
    #[error("target {0} is a reserved name")]
    ReservedTarget(String),

    /// An image payload could not be decoded
    #[error("image {index} is invalid: {reason}")]
    InvalidImage {
        /// Position of the image in the request
        index: usize,
        /// Why the payload was rejected
        reason: String,
    },

    /// An adapter requires an option that the job does not provide
    #[error("{option} is required for {target}")]
    MissingTargetOption {
        /// Target whose adapter rejected the options
        target: String,
        /// Name of the missing option
        option: String,
    },

    /// The caller-supplied correlation id is unusable
    #[error("correlation id must not be blank")]
    InvalidCorrelationId,

    /// A job with this id was already submitted
    #[error("job {0} already exists")]
    DuplicateJobId(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "no_targets",
///     "message": "invalid job: at least one target is required"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "no_targets")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::UnknownTarget(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 422 Unprocessable Entity - known target without credentials
            Error::TargetNotConfigured(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Platform { .. } => 502,
            Error::ImageUpload(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Validation(e) => match e {
                ValidationError::NoTargets => "no_targets",
                ValidationError::EmptyTarget { .. } => "empty_target",
                ValidationError::DuplicateTarget(_) => "duplicate_target",
                ValidationError::ReservedTarget(_) => "reserved_target",
                ValidationError::InvalidImage { .. } => "invalid_image",
                ValidationError::MissingTargetOption { .. } => "missing_target_option",
                ValidationError::InvalidCorrelationId => "invalid_correlation_id",
                ValidationError::DuplicateJobId(_) => "duplicate_job_id",
            },
            Error::NotFound(_) => "not_found",
            Error::UnknownTarget(_) => "unknown_target",
            Error::TargetNotConfigured(_) => "target_not_configured",
            Error::Platform { .. } => "platform_error",
            Error::ImageUpload(_) => "image_upload_failed",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Validation(ValidationError::EmptyTarget { index }) => {
                Some(serde_json::json!({ "index": index }))
            }
            Error::Validation(
                ValidationError::DuplicateTarget(target) | ValidationError::ReservedTarget(target),
            ) => Some(serde_json::json!({ "target": target })),
            Error::Validation(ValidationError::DuplicateJobId(id)) => {
                Some(serde_json::json!({ "jobId": id }))
            }
            Error::Validation(ValidationError::InvalidImage { index, reason }) => {
                Some(serde_json::json!({ "index": index, "reason": reason }))
            }
            Error::Validation(ValidationError::MissingTargetOption { target, option }) => {
                Some(serde_json::json!({ "target": target, "option": option }))
            }
            Error::Platform {
                target,
                status: Some(status),
                ..
            } => Some(serde_json::json!({ "target": target, "status": status })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
