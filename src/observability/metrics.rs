//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): relayed requests by namespace, status
//! - `proxy_request_duration_seconds` (histogram): time to response head
//! - `proxy_dial_failures_total` (counter): failed backend dials by namespace
//! - `proxy_active_relays` (gauge): relays whose body is still streaming
//! - `proxy_backend_up` (gauge): 1 while a namespace's backend is serving
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(namespace: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "namespace" => namespace.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "namespace" => namespace.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_dial_failure(namespace: &str) {
    counter!("proxy_dial_failures_total", "namespace" => namespace.to_string()).increment(1);
}

pub fn relay_started() {
    gauge!("proxy_active_relays").increment(1.0);
}

pub fn relay_finished() {
    gauge!("proxy_active_relays").decrement(1.0);
}

pub fn record_backend_up(namespace: &str, up: bool) {
    gauge!("proxy_backend_up", "namespace" => namespace.to_string())
        .set(if up { 1.0 } else { 0.0 });
}
