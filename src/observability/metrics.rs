//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, route kind, status
//! - `proxy_request_duration_seconds` (histogram): handler latency
//! - `proxy_pipeline_terminations_total` (counter): early replies by plugin
//! - `proxy_step_failures_total` (counter): failed plugin steps by plugin
//! - `proxy_config_reloads_total` (counter): reloads by source and outcome
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &'static str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "proxy_requests_total",
        "method" => method.clone(),
        "route" => route,
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "route" => route,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_termination(plugin: &str) {
    counter!("proxy_pipeline_terminations_total", "plugin" => plugin.to_string()).increment(1);
}

pub fn record_step_failure(plugin: &str) {
    counter!("proxy_step_failures_total", "plugin" => plugin.to_string()).increment(1);
}

pub fn record_reload(source: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("proxy_config_reloads_total", "source" => source, "outcome" => outcome).increment(1);
}
