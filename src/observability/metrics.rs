//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end forwarding latency
//! - `proxy_forward_failures_total` (counter): transport failures
//! - `proxy_rate_limited_total` (counter): requests rejected by the limiter
//! - `proxy_preflight_total` (counter): preflights answered by the gate
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("proxy_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_forward_failure() {
    counter!("proxy_forward_failures_total").increment(1);
}

pub fn record_rate_limited() {
    counter!("proxy_rate_limited_total").increment(1);
}

pub fn record_preflight() {
    counter!("proxy_preflight_total").increment(1);
}
