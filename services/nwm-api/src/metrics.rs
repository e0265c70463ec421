//! Prometheus metrics for the NWM API.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Count a finished request and record its latency.
pub fn record_request(endpoint: &'static str, status: u16, elapsed: Duration) {
    counter!("nwm_requests_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
    histogram!("nwm_request_duration_seconds", "endpoint" => endpoint)
        .record(elapsed.as_secs_f64());
}

/// Record one warehouse round trip for a query shape.
pub fn record_warehouse_query(shape: &'static str, ok: bool, elapsed: Duration) {
    histogram!("nwm_warehouse_query_duration_seconds", "shape" => shape)
        .record(elapsed.as_secs_f64());
    if !ok {
        counter!("nwm_warehouse_errors_total", "shape" => shape).increment(1);
    }
}

/// Count an outbound HydroShare lookup.
pub fn record_identifier_lookup(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("nwm_hydroshare_lookups_total", "outcome" => outcome).increment(1);
}

pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
