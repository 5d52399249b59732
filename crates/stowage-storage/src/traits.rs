//! Storage abstraction trait
//!
//! This module defines the ObjectStore trait the ingestion pipeline writes through.

use async_trait::async_trait;
use std::path::PathBuf;
use stowage_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidKey(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<AppError> for StorageError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Crypto(msg) => StorageError::Crypto(msg),
            other => StorageError::ConfigError(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Crypto(msg) => AppError::Crypto(msg),
            StorageError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Filesystem(other.to_string()),
        }
    }
}

/// Write/read access to encrypted objects addressed by file name
///
/// Implemented by [`crate::EncryptedObjectStore`]; the ingestion pipeline only depends on
/// this trait so tests can observe writes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Encrypt `data` and store it under the object path for `file_name`.
    /// Returns the path written.
    async fn put(&self, file_name: &str, data: &[u8]) -> StorageResult<PathBuf>;

    /// Read and decrypt the object stored for `file_name`
    async fn get(&self, file_name: &str) -> StorageResult<Vec<u8>>;

    /// Check if an object exists for `file_name`
    async fn exists(&self, file_name: &str) -> StorageResult<bool>;

    /// Storage root all objects live under
    fn root(&self) -> &std::path::Path;
}
