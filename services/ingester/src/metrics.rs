//! Prometheus metrics for the ingester service.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Count a finished invocation (`ignored`, `manual_override`, `extracted`, `failed`).
pub fn record_invocation(outcome: &'static str, elapsed: Duration) {
    counter!("ingest_events_total", "outcome" => outcome).increment(1);
    histogram!("ingest_duration_ms", "outcome" => outcome)
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// Count an event body that could not be parsed.
pub fn record_rejected_event() {
    counter!("ingest_events_rejected_total").increment(1);
}
