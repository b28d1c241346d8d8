//! Ingester configuration.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use ingestion::config::DEFAULT_MIME_TYPE;
use ingestion::{
    DocumentAiClient, DocumentAiConfig, GcpAuth, Ingester, PipelineConfig,
    DEFAULT_CHAMBER_ONE_LEGISLATURE,
};
use storage::{BucketRegistry, StorageBackend};

/// Top-level ingester configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngesterConfig {
    /// Suffix filter and bucket names
    pub pipeline: PipelineConfig,

    /// Document AI processor
    pub document_ai: DocumentAiConfig,

    /// Where buckets live
    pub storage: StorageBackend,

    /// Fixed bearer token; metadata server when unset
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl IngesterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            optional(name).ok_or_else(|| anyhow!("missing required environment variable {}", name))
        };

        let pipeline = PipelineConfig {
            expected_suffix: required("EXPECTED_SUFFIX_EXTENSION")?,
            pdf_bucket: required("PDF_FILES_BUCKET_NAME")?,
            output_bucket: required("TXT_RAW_FILES_BUCKET_NAME")?,
            chamber_one_legislature: match optional("CHAMBER_ONE_LEGISLATURE_ID") {
                Some(value) => value
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("invalid CHAMBER_ONE_LEGISLATURE_ID {:?}", value))?,
                None => DEFAULT_CHAMBER_ONE_LEGISLATURE,
            },
        };

        let document_ai = DocumentAiConfig {
            project_id: required("PROJECT_ID")?,
            location: required("LOCATION")?,
            processor_id: required("PROCESSOR_ID")?,
            mime_type: optional("PDF_MIME_TYPE").unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            field_mask: optional("FIELD_MASK"),
            endpoint: optional("DOCUMENTAI_ENDPOINT"),
        };

        let storage = match optional("STORAGE_BACKEND")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("gcs") => StorageBackend::Gcs,
            Some("memory") => StorageBackend::Memory,
            Some("local") => StorageBackend::Local {
                root: PathBuf::from(required("STORAGE_LOCAL_ROOT")?),
            },
            Some(other) => bail!("unknown STORAGE_BACKEND {:?} (expected gcs, local or memory)", other),
        };

        let config = Self {
            pipeline,
            document_ai,
            storage,
            access_token: optional("GOOGLE_OAUTH_ACCESS_TOKEN"),
        };

        config.pipeline.validate()?;
        config.document_ai.validate()?;
        Ok(config)
    }

    /// Wire storage, auth and the Document AI client into an [`Ingester`].
    pub fn build_ingester(&self) -> Ingester {
        let auth = match &self.access_token {
            Some(token) => GcpAuth::from_token(token.clone()),
            None => GcpAuth::metadata_server(),
        };

        let processor = DocumentAiClient::new(self.document_ai.clone(), Arc::new(auth));
        let buckets = BucketRegistry::new(self.storage.clone());

        info!(
            processor = %self.document_ai.processor_name(),
            storage = ?self.storage,
            pdf_bucket = %self.pipeline.pdf_bucket,
            output_bucket = %self.pipeline.output_bucket,
            suffix = %self.pipeline.expected_suffix,
            "Built ingestion pipeline"
        );

        Ingester::new(
            self.pipeline.clone(),
            Arc::new(buckets),
            Arc::new(processor),
            self.document_ai.mime_type.clone(),
        )
    }
}
