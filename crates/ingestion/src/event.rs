//! Storage trigger events.
//!
//! Notifications arrive as CloudEvents in either content mode:
//! - binary: `ce-*` headers, body is the `StorageObjectData` JSON
//! - structured: `application/cloudevents+json`, object under `data`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// The object that fired the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub bucket: String,
    pub key: String,
    /// CloudEvent id, for log correlation only
    #[serde(default)]
    pub event_id: Option<String>,
    /// CloudEvent type, e.g. `google.cloud.storage.object.v1.finalized`
    #[serde(default)]
    pub event_type: Option<String>,
}

/// Payload of a `google.cloud.storage.object.v1.*` event.
///
/// Only `bucket` and `name` drive the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObjectData {
    pub bucket: String,
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredCloudEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    data: StorageObjectData,
}

impl TriggerEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            event_id: None,
            event_type: None,
        }
    }

    /// Parse a binary-mode body; id and type come from the `ce-*` headers.
    pub fn from_binary(
        body: &[u8],
        event_id: Option<String>,
        event_type: Option<String>,
    ) -> Result<Self> {
        let data: StorageObjectData = serde_json::from_slice(body)
            .map_err(|e| IngestionError::InvalidEvent(format!("storage object data: {}", e)))?;

        Ok(Self {
            bucket: data.bucket,
            key: data.name,
            event_id,
            event_type,
        })
    }

    /// Parse a structured-mode CloudEvent.
    pub fn from_structured(body: &[u8]) -> Result<Self> {
        let event: StructuredCloudEvent = serde_json::from_slice(body)
            .map_err(|e| IngestionError::InvalidEvent(format!("structured cloud event: {}", e)))?;

        Ok(Self {
            bucket: event.data.bucket,
            key: event.data.name,
            event_id: event.id,
            event_type: event.event_type,
        })
    }
}
