//! Google Document AI client for PDF text extraction.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::auth::GcpAuth;
use crate::config::DocumentAiConfig;
use crate::error::{IngestionError, Result};

/// Document bytes handed to a processor.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub content: Bytes,
    pub mime_type: String,
}

/// What the pipeline needs back from OCR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedDocument {
    /// Full extracted text
    pub text: String,
    /// Number of pages the processor reported
    pub pages: usize,
}

/// A service that turns raw documents into text.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(&self, document: RawDocument) -> Result<ProcessedDocument>;
}

/// Document AI `process` client for a single processor.
pub struct DocumentAiClient {
    config: DocumentAiConfig,
    auth: Arc<GcpAuth>,
    http: reqwest::Client,
}

impl DocumentAiClient {
    pub fn new(config: DocumentAiConfig, auth: Arc<GcpAuth>) -> Self {
        Self {
            config,
            auth,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &DocumentAiConfig {
        &self.config
    }

    fn build_request(&self, document: &RawDocument) -> ProcessRequest {
        ProcessRequest {
            raw_document: RawDocumentBody {
                content: BASE64.encode(&document.content),
                mime_type: document.mime_type.clone(),
            },
            field_mask: self.config.field_mask.clone(),
        }
    }
}

#[async_trait]
impl DocumentProcessor for DocumentAiClient {
    async fn process(&self, document: RawDocument) -> Result<ProcessedDocument> {
        let token = self.auth.get_token().await?;
        let request = self.build_request(&document);
        let url = self.config.process_url();

        info!(
            processor = %self.config.processor_name(),
            size = document.content.len(),
            mime_type = %document.mime_type,
            "Sending document to Document AI"
        );

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                counter!("documentai_requests_total", "status" => "transport_error").increment(1);
                IngestionError::DocumentAi(format!("request to {} failed: {}", url, e))
            })?;

        let status = response.status();
        histogram!("documentai_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        counter!("documentai_requests_total", "status" => status.as_u16().to_string())
            .increment(1);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestionError::DocumentAi(format!(
                "processing failed ({}): {}",
                status, body
            )));
        }

        let process_response: ProcessResponse = response
            .json()
            .await
            .map_err(|e| IngestionError::DocumentAi(format!("invalid response: {}", e)))?;

        let processed = process_response.into_processed();
        info!(
            chars = processed.text.len(),
            pages = processed.pages,
            "Document AI extraction finished"
        );
        debug!(text = %processed.text, "Extracted text");

        Ok(processed)
    }
}

// ============================================================================
// API Request/Response types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    raw_document: RawDocumentBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_mask: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocumentBody {
    content: String,
    mime_type: String,
}

#[derive(Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    pages: Option<Vec<serde_json::Value>>,
}

impl ProcessResponse {
    fn into_processed(self) -> ProcessedDocument {
        match self.document {
            Some(document) => ProcessedDocument {
                text: document.text.unwrap_or_default(),
                pages: document.pages.map(|p| p.len()).unwrap_or(0),
            },
            None => ProcessedDocument::default(),
        }
    }
}
