//! End-to-end tests for the extraction pipeline.
//!
//! Buckets live in memory and Document AI is replaced by fakes, so these
//! run without network access.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ingestion::{
    DocumentProcessor, IngestOutcome, Ingester, IngestionError, PipelineConfig, ProcessedDocument,
    RawDocument, TriggerEvent, DEFAULT_CHAMBER_ONE_LEGISLATURE,
};
use storage::{BucketRegistry, ObjectRef, StorageBackend};

const METADATA_BUCKET: &str = "metadata-files";
const PDF_BUCKET: &str = "pdf-files";
const OUTPUT_BUCKET: &str = "txt-raw-files";
const SUFFIX: &str = ".json";

// ============================================================================
// Fakes and fixtures
// ============================================================================

/// Returns fixed text and remembers what it was asked to process.
struct FakeProcessor {
    text: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<RawDocument>>,
}

impl FakeProcessor {
    fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentProcessor for FakeProcessor {
    async fn process(&self, document: RawDocument) -> ingestion::Result<ProcessedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(document);
        Ok(ProcessedDocument {
            text: self.text.clone(),
            pages: 1,
        })
    }
}

/// Always fails, like a Document AI 500.
struct FailingProcessor {
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentProcessor for FailingProcessor {
    async fn process(&self, _document: RawDocument) -> ingestion::Result<ProcessedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(IngestionError::DocumentAi(
            "processing failed (500 Internal Server Error)".to_string(),
        ))
    }
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        expected_suffix: SUFFIX.to_string(),
        pdf_bucket: PDF_BUCKET.to_string(),
        output_bucket: OUTPUT_BUCKET.to_string(),
        chamber_one_legislature: DEFAULT_CHAMBER_ONE_LEGISLATURE,
    }
}

fn ingester(buckets: &Arc<BucketRegistry>, processor: Arc<dyn DocumentProcessor>) -> Ingester {
    Ingester::new(
        pipeline_config(),
        buckets.clone(),
        processor,
        "application/pdf",
    )
}

async fn put(buckets: &BucketRegistry, bucket: &str, name: &str, body: &[u8]) {
    buckets
        .bucket(bucket)
        .await
        .unwrap()
        .put(name, Bytes::copy_from_slice(body))
        .await
        .unwrap();
}

async fn read_json(buckets: &BucketRegistry, bucket: &str, name: &str) -> serde_json::Value {
    let bytes = buckets.bucket(bucket).await.unwrap().get(name).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn output_objects(buckets: &BucketRegistry) -> Vec<String> {
    buckets
        .bucket(OUTPUT_BUCKET)
        .await
        .unwrap()
        .list(None)
        .await
        .unwrap()
}

// ============================================================================
// Suffix filter
// ============================================================================

#[tokio::test]
async fn test_non_matching_key_is_ignored_without_download() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    let processor = FakeProcessor::returning("unused");
    let ingester = ingester(&buckets, processor.clone());

    // Neither object exists: touching storage would fail the call.
    for key in ["DOC-1.pdf", "DOC-1.json.tmp", ".json", ""] {
        let outcome = ingester
            .handle_event(&TriggerEvent::new(METADATA_BUCKET, key))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Ignored {
                key: key.to_string()
            }
        );
    }

    assert_eq!(processor.calls(), 0);
    assert!(output_objects(&buckets).await.is_empty());
}

// ============================================================================
// Extraction
// ============================================================================

#[tokio::test]
async fn test_extracts_text_and_writes_result() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "X_meta.json",
        br#"{"id_legislatura": 184, "cod_documento": "X", "num_registro": "1"}"#,
    )
    .await;
    put(&buckets, PDF_BUCKET, "X.pdf", b"%PDF-1.7 fake").await;

    let processor = FakeProcessor::returning("Texto extraido\n");
    let ingester = ingester(&buckets, processor.clone());

    let outcome = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "X_meta.json"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        IngestOutcome::Extracted {
            source: ObjectRef::new(PDF_BUCKET, "X.pdf"),
            target: ObjectRef::new(OUTPUT_BUCKET, "X.json"),
        }
    );
    assert_eq!(outcome.label(), "extracted");

    // The PDF bytes were handed to the processor with the configured mime type
    assert_eq!(processor.calls(), 1);
    {
        let seen = processor.seen.lock().unwrap();
        assert_eq!(seen[0].content, Bytes::from_static(b"%PDF-1.7 fake"));
        assert_eq!(seen[0].mime_type, "application/pdf");
    }

    let result = read_json(&buckets, OUTPUT_BUCKET, "X.json").await;
    assert_eq!(
        result,
        serde_json::json!({
            "id_legislatura": 184,
            "camara": 1,
            "num_registro": "1",
            "cod_documento": "X",
            "texto": "Texto extraido\n"
        })
    );
}

#[tokio::test]
async fn test_other_legislature_maps_to_chamber_two() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "Y.json",
        br#"{"id_legislatura": 15, "cod_documento": "DOC-Y", "num_registro": 77}"#,
    )
    .await;
    put(&buckets, PDF_BUCKET, "DOC-Y.pdf", b"%PDF").await;

    let ingester = ingester(&buckets, FakeProcessor::returning("abc"));
    ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "Y.json"))
        .await
        .unwrap();

    let result = read_json(&buckets, OUTPUT_BUCKET, "DOC-Y.json").await;
    assert_eq!(result["camara"], 2);
    assert_eq!(result["num_registro"], 77);
    assert_eq!(result.as_object().unwrap().len(), 5);
}

// ============================================================================
// Manual override
// ============================================================================

#[tokio::test]
async fn test_manual_override_skips_ocr_and_write() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "Z.json",
        br#"{"id_legislatura": 184, "cod_documento": "Z", "num_registro": "9", "unique_req_text": "manual"}"#,
    )
    .await;
    put(&buckets, PDF_BUCKET, "Z.pdf", b"%PDF").await;

    let processor = FakeProcessor::returning("unused");
    let ingester = ingester(&buckets, processor.clone());

    let outcome = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "Z.json"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        IngestOutcome::ManualOverride {
            cod_documento: "Z".to_string()
        }
    );
    assert_eq!(processor.calls(), 0);
    assert!(output_objects(&buckets).await.is_empty());
}

#[tokio::test]
async fn test_manual_override_needs_only_document_code() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "Z.json",
        br#"{"cod_documento": "Z", "unique_req_text": "manual"}"#,
    )
    .await;

    let processor = FakeProcessor::returning("unused");
    let ingester = ingester(&buckets, processor.clone());

    let outcome = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "Z.json"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        IngestOutcome::ManualOverride {
            cod_documento: "Z".to_string()
        }
    );
    assert_eq!(processor.calls(), 0);
    assert!(output_objects(&buckets).await.is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_result_write_failure_fails_invocation() {
    let root = tempfile::tempdir().unwrap();
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Local {
        root: root.path().to_path_buf(),
    }));
    put(
        &buckets,
        METADATA_BUCKET,
        "W.json",
        br#"{"id_legislatura": 184, "cod_documento": "W", "num_registro": "4"}"#,
    )
    .await;
    put(&buckets, PDF_BUCKET, "W.pdf", b"%PDF").await;

    // A plain file where the output bucket directory should be
    std::fs::write(root.path().join(OUTPUT_BUCKET), b"not a directory").unwrap();

    let processor = FakeProcessor::returning("texto");
    let ingester = ingester(&buckets, processor.clone());

    let err = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "W.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::Storage(_)));
    assert_eq!(processor.calls(), 1);
    assert!(!root.path().join(OUTPUT_BUCKET).join("W.json").exists());
}

#[tokio::test]
async fn test_ocr_failure_writes_nothing() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "F.json",
        br#"{"id_legislatura": 184, "cod_documento": "F", "num_registro": "2"}"#,
    )
    .await;
    put(&buckets, PDF_BUCKET, "F.pdf", b"%PDF").await;

    let processor = Arc::new(FailingProcessor {
        calls: AtomicUsize::new(0),
    });
    let ingester = ingester(&buckets, processor.clone());

    let err = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "F.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::DocumentAi(_)));
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    assert!(output_objects(&buckets).await.is_empty());
}

#[tokio::test]
async fn test_missing_pdf_fails_before_ocr() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "M.json",
        br#"{"id_legislatura": 184, "cod_documento": "M", "num_registro": "3"}"#,
    )
    .await;

    let processor = FakeProcessor::returning("unused");
    let ingester = ingester(&buckets, processor.clone());

    let err = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "M.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::Storage(_)));
    assert_eq!(processor.calls(), 0);
    assert!(output_objects(&buckets).await.is_empty());
}

#[tokio::test]
async fn test_undecodable_metadata_fails() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "bad.json",
        br#"{"id_legislatura": "not a number", "cod_documento": "B", "num_registro": "1"}"#,
    )
    .await;

    let processor = FakeProcessor::returning("unused");
    let ingester = ingester(&buckets, processor.clone());

    let err = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "bad.json"))
        .await
        .unwrap_err();

    match err {
        IngestionError::MetadataDecode { object, .. } => {
            assert_eq!(object, "gs://metadata-files/bad.json")
        }
        other => panic!("expected MetadataDecode, got {other:?}"),
    }
    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_missing_fields_fail_without_override() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    put(
        &buckets,
        METADATA_BUCKET,
        "short.json",
        br#"{"cod_documento": "S"}"#,
    )
    .await;
    put(&buckets, PDF_BUCKET, "S.pdf", b"%PDF").await;

    let processor = FakeProcessor::returning("unused");
    let ingester = ingester(&buckets, processor.clone());

    let err = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "short.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::MetadataDecode { .. }));
    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_missing_metadata_object_fails() {
    let buckets = Arc::new(BucketRegistry::new(StorageBackend::Memory));
    let ingester = ingester(&buckets, FakeProcessor::returning("unused"));

    let err = ingester
        .handle_event(&TriggerEvent::new(METADATA_BUCKET, "gone.json"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestionError::Storage(storage::StorageError::NotFound { .. })
    ));
}
