//! Error types for tube-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Validation, Retrieval, Assembly, Resource)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Errors raised inside a job never reach the client directly. They collapse into the
//! job's `error` string, which is the error's `Display` output, so the variants that can
//! occur mid-job render their message without a category prefix.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::JobId;

/// Result type alias for tube-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tube-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_jobs")
        key: Option<String>,
    },

    /// Malformed identifier or submission
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The retrieval collaborator failed
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Building the deliverable failed
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// Cleanup of job storage failed (logged, never sent to clients)
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Job not found in the registry
    #[error("job {0} not found")]
    JobNotFound(JobId),

    /// A job with this id is already registered
    #[error("job {0} already exists")]
    DuplicateJob(JobId),

    /// Requested resource (a job or a result file) is not available
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// HTTP client error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Validation errors (submission time, or an identifier re-checked mid-job)
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Identifier does not match the 11-character `[A-Za-z0-9_-]` pattern
    #[error("Invalid video ID: {0}")]
    InvalidVideoId(String),

    /// No line of the submission yielded an identifier
    #[error("No valid YouTube URLs found.")]
    NoValidUrls,

    /// Required request field is absent
    #[error("Missing {0} in request")]
    MissingField(&'static str),

    /// A job was created with no items
    #[error("job has no items")]
    EmptyBatch,
}

/// Errors reported by the retrieval and metadata collaborators
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The external download tool could not be located
    #[error("{tool} executable not found")]
    ToolNotFound {
        /// Tool name (e.g., "yt-dlp")
        tool: &'static str,
    },

    /// The external download tool exited with an error (message kept verbatim)
    #[error("{message}")]
    ToolFailed {
        /// Last error line reported by the tool
        message: String,
        /// Process exit code, if any
        exit_code: Option<i32>,
    },

    /// Format list could not be obtained or parsed
    #[error("failed to read available formats: {0}")]
    ProbeFailed(String),

    /// No encoding satisfied the format selection policy
    #[error("{0}")]
    NoSuitableFormat(String),

    /// The fetch exceeded the configured timeout
    #[error("download timed out after {0} seconds")]
    Timeout(u64),

    /// Metadata lookup failed
    #[error("metadata lookup failed for {url}: {reason}")]
    Metadata {
        /// Source URL that was looked up
        url: String,
        /// Why the lookup failed
        reason: String,
    },
}

/// Errors raised while packaging the deliverable
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// No artifact was produced by any item
    #[error("No files downloaded.")]
    NoFilesDownloaded,

    /// Writing the archive failed
    #[error("failed to create archive {path}: {reason}")]
    Archive {
        /// Archive path being written
        path: PathBuf,
        /// Why the write failed
        reason: String,
    },

    /// Moving an artifact into the result directory failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },
}

/// Cleanup failures
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Removing a job directory failed
    #[error("failed to remove {path}: {reason}")]
    CleanupFailed {
        /// Directory that could not be removed
        path: PathBuf,
        /// The reason removal failed
        reason: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "no_valid_urls",
///     "message": "No valid YouTube URLs found."
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
    /// Machine-readable error code (e.g., "not_found", "no_valid_urls")
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

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
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

            // 404 Not Found
            Error::JobNotFound(_) => 404,
            Error::NotFound(_) => 404,

            // 409 Conflict
            Error::DuplicateJob(_) => 409,

            // 422 Unprocessable Entity - job-level failures surfaced synchronously
            Error::Assembly(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Resource(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Retrieval(RetrievalError::ToolNotFound { .. }) => 503,
            Error::Retrieval(RetrievalError::Timeout(_)) => 504,
            Error::Retrieval(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(e) => match e {
                ValidationError::InvalidVideoId(_) => "invalid_video_id",
                ValidationError::NoValidUrls => "no_valid_urls",
                ValidationError::MissingField(_) => "missing_video_urls",
                ValidationError::EmptyBatch => "empty_batch",
            },
            Error::Retrieval(e) => match e {
                RetrievalError::ToolNotFound { .. } => "tool_not_found",
                RetrievalError::ToolFailed { .. } => "retrieval_failed",
                RetrievalError::ProbeFailed(_) => "probe_failed",
                RetrievalError::NoSuitableFormat(_) => "no_suitable_format",
                RetrievalError::Timeout(_) => "retrieval_timeout",
                RetrievalError::Metadata { .. } => "metadata_failed",
            },
            Error::Assembly(e) => match e {
                AssemblyError::NoFilesDownloaded => "no_files_downloaded",
                AssemblyError::Archive { .. } => "archive_failed",
                AssemblyError::MoveFailed { .. } => "move_failed",
            },
            Error::Resource(_) => "cleanup_failed",
            Error::Io(_) => "io_error",
            Error::JobNotFound(_) => "job_not_found",
            Error::DuplicateJob(_) => "duplicate_job",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
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
            Error::JobNotFound(id) | Error::DuplicateJob(id) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Validation(ValidationError::InvalidVideoId(video_id)) => {
                Some(serde_json::json!({
                    "video_id": video_id,
                }))
            }
            Error::Retrieval(RetrievalError::ToolFailed {
                exit_code: Some(code),
                ..
            }) => Some(serde_json::json!({
                "exit_code": code,
            })),
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
