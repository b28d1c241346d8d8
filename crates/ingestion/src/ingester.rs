//! The extraction pipeline: trigger → metadata → Document AI → result.

use std::sync::Arc;
use tracing::{error, info, instrument};

use storage::{BucketRegistry, ObjectRef};

use crate::config::PipelineConfig;
use crate::document_ai::{DocumentProcessor, RawDocument};
use crate::error::Result;
use crate::event::TriggerEvent;
use crate::metadata::{MetadataFile, MetadataRecord, ResultRecord};
use crate::upload::write_result;

/// What an invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Key did not end with the expected suffix; nothing was read.
    Ignored { key: String },
    /// Metadata carried the manual-override marker; OCR skipped, nothing written.
    ManualOverride { cod_documento: String },
    /// Text extracted and written.
    Extracted { source: ObjectRef, target: ObjectRef },
}

impl IngestOutcome {
    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            IngestOutcome::Ignored { .. } => "ignored",
            IngestOutcome::ManualOverride { .. } => "manual_override",
            IngestOutcome::Extracted { .. } => "extracted",
        }
    }
}

/// Handles storage trigger events.
///
/// Holds no per-invocation state; one instance can serve concurrent events.
pub struct Ingester {
    config: PipelineConfig,
    buckets: Arc<BucketRegistry>,
    processor: Arc<dyn DocumentProcessor>,
    mime_type: String,
}

impl Ingester {
    pub fn new(
        config: PipelineConfig,
        buckets: Arc<BucketRegistry>,
        processor: Arc<dyn DocumentProcessor>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            config,
            buckets,
            processor,
            mime_type: mime_type.into(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline for one event.
    ///
    /// Any failure (download, decode, OCR, write) is returned as-is; the
    /// caller reports it as a failed invocation.
    #[instrument(skip(self, event), fields(bucket = %event.bucket, key = %event.key))]
    pub async fn handle_event(&self, event: &TriggerEvent) -> Result<IngestOutcome> {
        info!(event_id = ?event.event_id, "Received trigger event");

        if !self.config.matches_suffix(&event.key) {
            info!(suffix = %self.config.expected_suffix, "Nothing to do");
            return Ok(IngestOutcome::Ignored {
                key: event.key.clone(),
            });
        }

        let file = self.load_metadata(event).await?;

        if file.manual_override {
            info!(
                cod_documento = %file.cod_documento,
                "Manual run from text, skipping extraction"
            );
            return Ok(IngestOutcome::ManualOverride {
                cod_documento: file.cod_documento,
            });
        }

        let metadata = file.record()?;
        info!(
            id_legislatura = metadata.id_legislatura,
            num_registro = ?metadata.num_registro,
            cod_documento = %metadata.cod_documento,
            "Metadata decoded"
        );

        let source = ObjectRef::new(&self.config.pdf_bucket, metadata.pdf_object_name());
        let target_name = metadata.target_object_name();
        info!(source = %source, target = %target_name, "Extracting text");

        match self.extract(&metadata, &source, &target_name).await {
            Ok(target) => {
                info!(
                    source = %source,
                    target = %target,
                    "PDF sent to Document AI and raw results written"
                );
                Ok(IngestOutcome::Extracted { source, target })
            }
            Err(e) => {
                error!(source = %source, error = %e, "Text extraction failed");
                Err(e)
            }
        }
    }

    async fn load_metadata(&self, event: &TriggerEvent) -> Result<MetadataFile> {
        let object = ObjectRef::new(&event.bucket, &event.key);
        let storage = self.buckets.bucket(&event.bucket).await?;
        let bytes = storage.get(&event.key).await?;

        let file = MetadataFile::from_slice(&object.to_string(), &bytes)?;
        info!(
            object = %object,
            cod_documento = %file.cod_documento,
            manual_override = file.manual_override,
            "Metadata downloaded"
        );
        Ok(file)
    }

    async fn extract(
        &self,
        metadata: &MetadataRecord,
        source: &ObjectRef,
        target_name: &str,
    ) -> Result<ObjectRef> {
        let pdf_storage = self.buckets.bucket(&source.bucket).await?;
        let content = pdf_storage.get(&source.name).await?;

        let document = self
            .processor
            .process(RawDocument {
                content,
                mime_type: self.mime_type.clone(),
            })
            .await?;

        let record = ResultRecord::from_metadata(
            metadata,
            document.text,
            self.config.chamber_one_legislature,
        );

        let output = self.buckets.bucket(&self.config.output_bucket).await?;
        write_result(&output, target_name, &record).await
    }
}
