//! Error types for the ingestion crate.

use thiserror::Error;

/// Errors that can occur while processing a trigger event.
///
/// Callers treat every variant the same way (the invocation failed); the
/// split only exists so logs say which step broke.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Failed to decode metadata {object}: {source}")]
    MetadataDecode {
        object: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid trigger event: {0}")]
    InvalidEvent(String),

    #[error("Failed to obtain access token: {0}")]
    Auth(String),

    #[error("Document AI request failed: {0}")]
    DocumentAi(String),

    #[error("Failed to encode result: {0}")]
    ResultEncode(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
