//! Document text extraction library.
//!
//! Turns "metadata object created" notifications into extracted-text JSON
//! documents:
//!
//! 1. Filter the triggering object key on the configured suffix
//! 2. Download and decode the metadata record
//! 3. Unless the record is a manual re-run, send the matching PDF to
//!    Document AI
//! 4. Write the extracted text plus passthrough fields to the results bucket
//!
//! The `ingester` service wraps this in an HTTP CloudEvent receiver.

pub mod auth;
pub mod config;
pub mod document_ai;
pub mod error;
pub mod event;
pub mod metadata;
mod ingester;
mod upload;

// Re-exports
pub use auth::GcpAuth;
pub use config::{DocumentAiConfig, PipelineConfig, DEFAULT_CHAMBER_ONE_LEGISLATURE};
pub use document_ai::{DocumentAiClient, DocumentProcessor, ProcessedDocument, RawDocument};
pub use error::{IngestionError, Result};
pub use event::TriggerEvent;
pub use ingester::{IngestOutcome, Ingester};
pub use metadata::{MetadataFile, MetadataRecord, ResultRecord, MANUAL_OVERRIDE_MARKER};
pub use upload::write_result;
