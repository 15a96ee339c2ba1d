//! Prometheus metrics

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call once at startup.
pub fn init_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "metrics recorder not installed"),
    }
}

/// Render metrics for scraping
pub async fn metrics_handler() -> impl IntoResponse {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

/// Count a finished chat request
pub fn record_request(success: bool, streamed: bool) {
    metrics::counter!(
        "climate_agent_requests_total",
        "success" => if success { "true" } else { "false" },
        "streamed" => if streamed { "true" } else { "false" },
    )
    .increment(1);
}

/// Record end-to-end request latency in seconds
pub fn record_latency(seconds: f64) {
    metrics::histogram!("climate_agent_request_seconds").record(seconds);
}
