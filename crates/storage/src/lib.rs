//! Storage abstractions for the document extraction services.
//!
//! Provides a bucket-addressed interface over `object_store`:
//! - Google Cloud Storage for deployed functions
//! - Local filesystem directories for development
//! - In-memory buckets for tests

pub mod error;
pub mod object_store;
pub mod registry;

pub use self::object_store::{validate_bucket_name, ObjectRef, ObjectStorage, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use registry::BucketRegistry;
