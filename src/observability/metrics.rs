//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ziply_requests_total` (counter): requests by method, status
//! - `ziply_request_duration_seconds` (histogram): latency distribution
//! - `ziply_store_connected` (gauge): 1=connected, 0=not

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and spawn its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!("ziply_requests_total", "Requests served by method and status");
            describe_histogram!(
                "ziply_request_duration_seconds",
                "Request latency distribution"
            );
            describe_gauge!("ziply_store_connected", "Store connection state (1=connected)");
            tracing::info!(address = %addr, "metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to install metrics exporter");
        }
    }
}

/// Record a served request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "ziply_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!("ziply_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record the store connection state.
pub fn record_store_connected(connected: bool) {
    gauge!("ziply_store_connected").set(if connected { 1.0 } else { 0.0 });
}
