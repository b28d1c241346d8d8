//! Result upload.

use bytes::Bytes;
use storage::{ObjectRef, ObjectStorage};
use tracing::debug;

use crate::error::Result;
use crate::metadata::ResultRecord;

/// Serialize `record` as JSON and store it under `name`.
///
/// # Returns
/// Location of the written object
pub async fn write_result(
    storage: &ObjectStorage,
    name: &str,
    record: &ResultRecord,
) -> Result<ObjectRef> {
    let body = serde_json::to_vec(record)?;
    let size = body.len();

    storage.put(name, Bytes::from(body)).await?;

    let object = storage.object_ref(name);
    debug!(object = %object, size = size, "Wrote result");
    Ok(object)
}
