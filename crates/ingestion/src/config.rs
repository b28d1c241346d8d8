//! Pipeline and Document AI configuration.

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Legislature code whose documents belong to chamber 1.
pub const DEFAULT_CHAMBER_ONE_LEGISLATURE: i64 = 184;

/// Default mime type sent along with the raw document.
pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// Settings for the trigger → extract → write flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Only object keys ending with this suffix are processed
    pub expected_suffix: String,
    /// Bucket holding `{cod_documento}.pdf`
    pub pdf_bucket: String,
    /// Bucket receiving `{cod_documento}.json`
    pub output_bucket: String,
    /// `id_legislatura` value mapped to `camara = 1`
    #[serde(default = "default_chamber_one")]
    pub chamber_one_legislature: i64,
}

fn default_chamber_one() -> i64 {
    DEFAULT_CHAMBER_ONE_LEGISLATURE
}

impl PipelineConfig {
    /// Whether a triggering key should be processed.
    ///
    /// The key has to be strictly longer than the suffix, so an object
    /// named exactly like the suffix is ignored.
    pub fn matches_suffix(&self, key: &str) -> bool {
        key.len() > self.expected_suffix.len() && key.ends_with(&self.expected_suffix)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pdf_bucket.trim().is_empty() {
            return Err(IngestionError::InvalidConfig(
                "PDF bucket name is empty".to_string(),
            ));
        }
        if self.output_bucket.trim().is_empty() {
            return Err(IngestionError::InvalidConfig(
                "output bucket name is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Document AI processor coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAiConfig {
    pub project_id: String,
    /// Processor location, `us` or `eu`
    pub location: String,
    pub processor_id: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Optional field mask restricting the returned Document
    #[serde(default)]
    pub field_mask: Option<String>,
    /// Base URL override (tests, private endpoints)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

impl DocumentAiConfig {
    /// Full processor resource name:
    /// `projects/{project}/locations/{location}/processors/{processor}`
    pub fn processor_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/processors/{}",
            self.project_id, self.location, self.processor_id
        )
    }

    /// Regional API base URL, e.g. `https://eu-documentai.googleapis.com`.
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-documentai.googleapis.com", self.location),
        }
    }

    /// URL of the synchronous `process` method.
    pub fn process_url(&self) -> String {
        format!("{}/v1/{}:process", self.base_url(), self.processor_name())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("project id", &self.project_id),
            ("location", &self.location),
            ("processor id", &self.processor_id),
        ] {
            if value.trim().is_empty() {
                return Err(IngestionError::InvalidConfig(format!(
                    "Document AI {} is empty",
                    name
                )));
            }
        }
        Ok(())
    }
}
