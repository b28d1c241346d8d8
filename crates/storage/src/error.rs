//! Error types for the storage crate.

use thiserror::Error;

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: gs://{bucket}/{path}")]
    NotFound { bucket: String, path: String },

    #[error("Failed to create client for bucket {bucket}: {message}")]
    Client { bucket: String, message: String },

    #[error("Invalid bucket name {bucket:?}: {reason}")]
    InvalidBucket { bucket: String, reason: &'static str },

    #[error("Invalid object name gs://{bucket}/{path}: {message}")]
    InvalidPath {
        bucket: String,
        path: String,
        message: String,
    },

    #[error("Storage error: {0}")]
    Backend(String),
}
