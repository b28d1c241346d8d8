//! Bucket name to storage client resolution.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StorageResult;
use crate::object_store::{ObjectStorage, StorageBackend};

/// Hands out one [`ObjectStorage`] per bucket name.
///
/// Clients are created on first use. Later lookups of the same bucket
/// return the same handle, which is what makes in-memory buckets visible
/// across calls.
pub struct BucketRegistry {
    backend: StorageBackend,
    buckets: Mutex<HashMap<String, Arc<ObjectStorage>>>,
}

impl BucketRegistry {
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Backend used for newly created clients.
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Get (or create) the client for `bucket`.
    pub async fn bucket(&self, bucket: &str) -> StorageResult<Arc<ObjectStorage>> {
        let mut buckets = self.buckets.lock().await;

        if let Some(storage) = buckets.get(bucket) {
            return Ok(storage.clone());
        }

        debug!(bucket = %bucket, backend = ?self.backend, "Creating storage client");
        let storage = Arc::new(ObjectStorage::new(&self.backend, bucket)?);
        buckets.insert(bucket.to_string(), storage.clone());
        Ok(storage)
    }
}
