//! HTTP server for the ingester service.
//!
//! Provides endpoints for:
//! - `POST /` and `POST /events` - Storage CloudEvent delivery
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use ingestion::{IngestionError, Ingester, TriggerEvent};

use crate::metrics;

/// Body returned to the invoking framework on success.
pub const SUCCESS_BODY: &str = "\"Function finished successfully!\"";

/// Content type of structured-mode CloudEvents.
const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Shared state for the HTTP server.
pub struct ServerState {
    /// Extraction pipeline
    pub ingester: Ingester,
    /// Prometheus handle, absent when no recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

/// Invocation result in the `{statusCode, body}` shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub body: String,
}

impl FunctionResponse {
    fn new(status: StatusCode, body: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                status_code: status.as_u16(),
                body: body.into(),
            }),
        )
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Decode the trigger from either CloudEvent content mode.
fn parse_event(headers: &HeaderMap, body: &[u8]) -> Result<TriggerEvent, IngestionError> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let structured = header_value(header::CONTENT_TYPE.as_str())
        .map(|ct| ct.starts_with(STRUCTURED_CONTENT_TYPE))
        .unwrap_or(false);

    if structured {
        TriggerEvent::from_structured(body)
    } else {
        TriggerEvent::from_binary(body, header_value("ce-id"), header_value("ce-type"))
    }
}

/// POST / - Handle a storage CloudEvent
async fn event_handler(
    Extension(state): Extension<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event = match parse_event(&headers, &body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected malformed event");
            metrics::record_rejected_event();
            return FunctionResponse::new(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let start = Instant::now();
    match state.ingester.handle_event(&event).await {
        Ok(outcome) => {
            info!(
                bucket = %event.bucket,
                key = %event.key,
                outcome = outcome.label(),
                "Function finished successfully"
            );
            metrics::record_invocation(outcome.label(), start.elapsed());
            FunctionResponse::new(StatusCode::OK, SUCCESS_BODY)
        }
        Err(e) => {
            error!(
                bucket = %event.bucket,
                key = %event.key,
                error = %e,
                "Errors found during execution"
            );
            metrics::record_invocation("failed", start.elapsed());
            FunctionResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Errors found during execution: {}", e),
            )
        }
    }
}

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "ingester".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics - Prometheus metrics
async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n".to_string(),
        ),
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", post(event_handler))
        .route("/events", post(event_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server.
pub async fn start_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting ingester HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
