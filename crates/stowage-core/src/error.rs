//! Error types module
//!
//! All pipeline failures are unified under the `AppError` enum. The variants follow the
//! failure taxonomy of the pipeline: broker (`Channel`), disk (`Filesystem`), cipher
//! (`Crypto`), catalog (`Storage`) and undecodable payloads (`MalformedMessage`).
//!
//! The `Storage` variant wraps `sqlx::Error` when the `sqlx` feature is enabled. Without
//! it, the variant carries a message string instead.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Self-description of an error for logging at the coordinator boundary
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "CHANNEL_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the same operation could succeed if attempted again later
    fn is_recoverable(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[cfg(feature = "sqlx")]
    #[error("Storage error: {0}")]
    Storage(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias used across the workspace
pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Storage(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Filesystem(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedMessage(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool) {
    match err {
        AppError::Channel(_) => ("CHANNEL_ERROR", true),
        AppError::Filesystem(_) => ("FILESYSTEM_ERROR", true),
        AppError::Crypto(_) => ("CRYPTO_ERROR", false),
        AppError::Storage(_) => ("STORAGE_ERROR", true),
        AppError::MalformedMessage(_) => ("MALFORMED_MESSAGE", false),
        AppError::Config(_) => ("CONFIG_ERROR", false),
        AppError::Internal(_) => ("INTERNAL_ERROR", true),
    }
}

impl AppError {
    /// Get the error type name, used as a structured log field
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Channel(_) => "Channel",
            AppError::Filesystem(_) => "Filesystem",
            AppError::Crypto(_) => "Crypto",
            AppError::Storage(_) => "Storage",
            AppError::MalformedMessage(_) => "MalformedMessage",
            AppError::Config(_) => "Config",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }
}
