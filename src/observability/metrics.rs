//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ext_proc_streams_total` (counter): streams opened
//! - `ext_proc_active_streams` (gauge): currently open streams
//! - `ext_proc_events_total` (counter): received events by kind
//! - `ext_proc_aggregation_duration_seconds` (histogram): fan-out/fan-in window
//! - `ext_proc_aggregations_total` (counter): aggregations by outcome
//! - `ext_proc_backend_fetch_errors_total` (counter): fetch failures by resource, kind

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::backend::{FetchError, ResourceKind};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_stream_opened() {
    counter!("ext_proc_streams_total").increment(1);
    gauge!("ext_proc_active_streams").increment(1.0);
}

pub fn record_stream_closed() {
    gauge!("ext_proc_active_streams").decrement(1.0);
}

pub fn record_event(kind: &'static str) {
    counter!("ext_proc_events_total", "kind" => kind).increment(1);
}

/// Record one aggregation and how long the fan-out/fan-in took.
pub fn record_aggregation(success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!("ext_proc_aggregations_total", "outcome" => outcome).increment(1);
    histogram!("ext_proc_aggregation_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_fetch_error(resource: ResourceKind, error: &FetchError) {
    counter!(
        "ext_proc_backend_fetch_errors_total",
        "resource" => resource.path(),
        "kind" => error.kind()
    )
    .increment(1);
}
