//! # Internal Metrics
//!
//! Installs the Prometheus recorder behind the `metrics` facade and registers
//! descriptions for every metric the relay emits. Recording happens at the
//! call sites through the `metrics` macros; when no recorder is installed
//! those calls are no-ops.

use anyhow::{Context, Result};
use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Registers descriptions for all metrics with the global recorder.
pub fn describe() {
    metrics::describe_counter!(
        "notifications_sent_total",
        Unit::Count,
        "Per-platform send attempts, labeled by platform and outcome."
    );
    metrics::describe_histogram!(
        "notification_send_duration_seconds",
        Unit::Seconds,
        "Latency of a single platform send, including timeouts."
    );
    metrics::describe_counter!(
        "notify_requests_rejected_total",
        Unit::Count,
        "Notification requests rejected before any send, labeled by reason."
    );
}

/// Installs the Prometheus recorder globally and returns the handle used to
/// render the `/metrics` endpoint.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    describe();
    Ok(handle)
}
