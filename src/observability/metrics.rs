//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mirror_cache_requests_total` (counter): responses by cache marker
//! - `mirror_cache_writes_total` (counter): store writes
//! - `mirror_upstream_requests_total` (counter): upstream responses by status
//! - `mirror_upstream_duration_seconds` (histogram): upstream latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::cache::CacheStatus;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_cache_status(status: CacheStatus) {
    counter!("mirror_cache_requests_total", "status" => status.as_str()).increment(1);
}

pub fn record_cache_write() {
    counter!("mirror_cache_writes_total").increment(1);
}

/// Record an upstream exchange; `status` is `None` when no response came back.
pub fn record_upstream(status: Option<u16>, start: Instant) {
    let label = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    counter!("mirror_upstream_requests_total", "status" => label).increment(1);
    histogram!("mirror_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}
