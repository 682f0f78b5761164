//! Metrics implementation using Prometheus.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use kiosk_core::{Error, Result};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| Error::telemetry(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Helper to track HTTP request metrics (latency, count).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Helper to track response cache hits and misses.
pub fn track_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    metrics::counter!("response_cache_lookups_total", "outcome" => outcome).increment(1);
}

/// Helper to track a single provider attempt and its outcome.
pub fn track_provider(model: &str, outcome: &str) {
    metrics::counter!(
        "provider_attempts_total",
        "model" => model.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
