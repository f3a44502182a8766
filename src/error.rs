//! Error types for pinboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, failed validation, store not configured)
//! - 3: Not found (document or task absent)
//! - 4: Operation failed (remote store, IO, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the pinboard CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for pinboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task store not configured: set {0}")]
    NotConfigured(String),

    // Not found (exit code 3)
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Operation failures (exit code 4)
    #[error("Remote store unavailable: {0}")]
    Remote(String),

    #[error("Remote store rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation(_)
            | Error::NotConfigured(_) => exit_codes::USER_ERROR,

            // Not found
            Error::DocumentNotFound(_) | Error::TaskNotFound(_) => exit_codes::NOT_FOUND,

            // Operation failures
            Error::Remote(_)
            | Error::RemoteRejected { .. }
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Whether a retry of the same call may succeed.
    ///
    /// Network failures, timeouts and server-side (5xx, 408, 429) responses are
    /// transient; everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote(_) => true,
            Error::Http(err) => match err.status() {
                Some(status) => is_transient_status(status.as_u16()),
                // No status: the exchange broke in transport. Bad payloads stay final.
                None => {
                    let transport = err.is_timeout()
                        || err.is_connect()
                        || err.is_request()
                        || err.is_body();
                    transport && !err.is_decode() && !err.is_builder()
                }
            },
            Error::RemoteRejected { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }

    /// Short machine-readable kind used in JSON output and notices
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotConfigured(_) => "not_configured",
            Error::Validation(_) => "validation",
            Error::DocumentNotFound(_) | Error::TaskNotFound(_) => "not_found",
            Error::Remote(_) | Error::Http(_) | Error::RemoteRejected { .. } => "remote",
            _ => match self.exit_code() {
                exit_codes::USER_ERROR => "user_error",
                _ => "operation_failed",
            },
        }
    }

    /// Structured details for JSON output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::RemoteRejected { status, .. } => {
                Some(serde_json::json!({ "status": status }))
            }
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::DocumentNotFound(slug) => Some(serde_json::json!({ "slug": slug })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

pub(crate) fn is_transient_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

/// Result type alias for pinboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
