//! Prometheus exposition for the metrics recorded by the cache layer.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Returns `true` if this call installed it, `false` if it was already
/// installed or another recorder is in place.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders the handle.
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render the current metrics in Prometheus text format.
///
/// Empty until [`init_metrics`] has run.
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}
