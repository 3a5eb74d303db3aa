//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // seconds, with sub-millisecond buckets for cache-served reads
    let buckets = vec![
        0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit zero values so HELP/TYPE lines are
/// present from startup.
pub fn describe_metrics() {
    describe_counter!("keyauth_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "keyauth_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "keyauth_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    describe_counter!(
        "keyauth_cache_operations_total",
        "User aggregate cache operations by operation and result"
    );
    describe_counter!(
        "keyauth_cascade_failures_total",
        "Member creation cascades aborted, by failing step"
    );

    gauge!("keyauth_http_requests_in_flight").set(0.0);
    counter!("keyauth_cache_operations_total", "op" => "get", "result" => "hit").absolute(0);
    counter!("keyauth_cache_operations_total", "op" => "get", "result" => "miss").absolute(0);
    counter!("keyauth_cascade_failures_total", "step" => "roles").absolute(0);
}
