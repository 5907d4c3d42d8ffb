//! Prometheus metrics for monitoring the tournament API.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener
//! when `METRICS_BIND` is configured.

#![allow(dead_code)] // Public API for future integration

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter.
///
/// Metrics become available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

/// Record HTTP request with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Increment tournaments-created counter.
pub fn tournaments_created_total() {
    metrics::counter!("tournaments_created_total").increment(1);
}

/// Increment match-results counter, labelled by acceptance.
pub fn match_results_total(accepted: bool) {
    metrics::counter!("match_results_total",
        "accepted" => accepted.to_string()
    )
    .increment(1);
}

/// Increment brackets-completed counter.
pub fn brackets_completed_total() {
    metrics::counter!("brackets_completed_total").increment(1);
}
