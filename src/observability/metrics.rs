//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, connections, event stream)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): handling latency
//! - `connections_active` (gauge): open connections by scheme
//! - `protocol_errors_total` (counter): rejected requests by error kind
//! - `redirects_total` (counter): plain requests sent to the secure port
//! - `sse_clients` (gauge): registered event-stream sinks
//! - `sse_events_total` (counter): broadcasts sent
//! - `sse_evictions_total` (counter): sinks dropped after a failed write
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality: no paths, no peer addresses

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(error) => tracing::error!(address = %addr, %error, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    counter!("http_requests_total", "method" => method.clone(), "status" => status.to_string())
        .increment(1);
    histogram!("http_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn connection_opened(scheme: &'static str) {
    gauge!("connections_active", "scheme" => scheme).increment(1.0);
}

pub fn connection_closed(scheme: &'static str) {
    gauge!("connections_active", "scheme" => scheme).decrement(1.0);
}

pub fn record_protocol_error(kind: &'static str) {
    counter!("protocol_errors_total", "kind" => kind).increment(1);
}

pub fn record_redirect() {
    counter!("redirects_total").increment(1);
}

pub fn set_sse_clients(count: usize) {
    gauge!("sse_clients").set(count as f64);
}

pub fn record_sse_event(delivered: usize) {
    counter!("sse_events_total").increment(1);
    histogram!("sse_event_fanout").record(delivered as f64);
}

pub fn record_sse_eviction(reason: &'static str) {
    counter!("sse_evictions_total", "reason" => reason).increment(1);
}
