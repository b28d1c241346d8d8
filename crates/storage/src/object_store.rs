//! Object storage interface for bucket objects (GCS compatible).

use bytes::Bytes;
use object_store::{
    gcp::GoogleCloudStorageBuilder, local::LocalFileSystem, memory::InMemory, path::Path,
    ObjectStore,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};

/// Where bucket contents actually live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackend {
    /// Google Cloud Storage, credentials resolved from the environment
    /// (service account file or the metadata server).
    #[default]
    Gcs,
    /// Each bucket is a directory under `root`.
    Local { root: PathBuf },
    /// Process-local buckets, lost on exit.
    Memory,
}

/// A fully qualified object location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.name)
    }
}

/// Check `bucket` against the GCS naming rules.
///
/// Names arrive in trigger events and become directory names on the local
/// backend, so anything that could address outside the root is refused.
pub fn validate_bucket_name(bucket: &str) -> StorageResult<()> {
    let invalid = |reason| {
        Err(StorageError::InvalidBucket {
            bucket: bucket.to_string(),
            reason,
        })
    };

    if bucket.len() < 3 || bucket.len() > 222 {
        return invalid("must be 3 to 222 characters long");
    }
    if !bucket
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.'))
    {
        return invalid("only lowercase letters, digits, '-', '_' and '.' are allowed");
    }
    let edges = [bucket.as_bytes()[0], bucket.as_bytes()[bucket.len() - 1]];
    if !edges.iter().all(|b| b.is_ascii_alphanumeric()) {
        return invalid("must start and end with a letter or digit");
    }
    if bucket.contains("..") {
        return invalid("must not contain '..'");
    }
    Ok(())
}

/// Object storage client bound to a single bucket.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a client for `bucket` on the given backend.
    pub fn new(backend: &StorageBackend, bucket: &str) -> StorageResult<Self> {
        validate_bucket_name(bucket)?;

        let client_error = |message: String| StorageError::Client {
            bucket: bucket.to_string(),
            message,
        };

        let store: Arc<dyn ObjectStore> = match backend {
            StorageBackend::Gcs => {
                let store = GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| client_error(format!("Failed to create GCS client: {}", e)))?;
                Arc::new(store)
            }
            StorageBackend::Local { root } => {
                let dir = root.join(bucket);
                std::fs::create_dir_all(&dir).map_err(|e| {
                    client_error(format!("Failed to create {}: {}", dir.display(), e))
                })?;
                let store = LocalFileSystem::new_with_prefix(&dir)
                    .map_err(|e| client_error(format!("Failed to open {}: {}", dir.display(), e)))?;
                Arc::new(store)
            }
            StorageBackend::Memory => Arc::new(InMemory::new()),
        };

        Ok(Self {
            store,
            bucket: bucket.to_string(),
        })
    }

    /// Bucket this client is bound to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fully qualified reference to `path` in this bucket.
    pub fn object_ref(&self, path: &str) -> ObjectRef {
        ObjectRef::new(&self.bucket, path)
    }

    /// Object names are used verbatim: no percent-encoding, and names with
    /// empty, `.` or `..` segments are rejected rather than normalized.
    fn location(&self, path: &str) -> StorageResult<Path> {
        Path::parse(path).map_err(|e| StorageError::InvalidPath {
            bucket: self.bucket.clone(),
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let location = self.location(path)?;
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| self.map_error(path, e, "write"))?;

        Ok(())
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = self.location(path)?;

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| self.map_error(path, e, "read"))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| self.map_error(path, e, "read bytes of"))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = self.location(path)?;

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::Backend(format!(
                "Failed to check {}: {}",
                self.object_ref(path),
                e
            ))),
        }
    }

    /// List object names with a given prefix.
    pub async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = prefix.map(|p| self.location(p)).transpose()?;
        let mut paths = Vec::new();

        let mut stream = self.store.list(prefix_path.as_ref());
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| StorageError::Backend(format!("List of {} failed: {}", self.bucket, e)))?
        {
            paths.push(meta.location.to_string());
        }

        paths.sort();
        Ok(paths)
    }

    /// Delete an object.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        let location = self.location(path)?;

        self.store
            .delete(&location)
            .await
            .map_err(|e| self.map_error(path, e, "delete"))?;

        Ok(())
    }

    fn map_error(&self, path: &str, err: object_store::Error, action: &str) -> StorageError {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound {
                bucket: self.bucket.clone(),
                path: path.to_string(),
            },
            other => StorageError::Backend(format!(
                "Failed to {} {}: {}",
                action,
                self.object_ref(path),
                other
            )),
        }
    }
}
