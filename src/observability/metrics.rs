//! Metrics collection and exposition.
//!
//! # Metrics
//! - `subs_fetch_total` (counter): source fetches by outcome
//! - `subs_fetch_duration_seconds` (histogram): per-source fetch latency
//! - `subs_merge_total` (counter): merges by outcome
//! - `subs_requests_total` (counter): `/subs` requests by status
//! - `subs_request_duration_seconds` (histogram): end-to-end latency

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_fetch(outcome: &'static str, start: Instant) {
    counter!("subs_fetch_total", "outcome" => outcome).increment(1);
    histogram!("subs_fetch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_merge(outcome: &'static str) {
    counter!("subs_merge_total", "outcome" => outcome).increment(1);
}

pub fn record_request(status: u16, start: Instant) {
    counter!("subs_requests_total", "status" => status.to_string()).increment(1);
    histogram!("subs_request_duration_seconds").record(start.elapsed().as_secs_f64());
}
