//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by outcome
//! - `dispatch_duration_seconds` (histogram): time spent in the dispatcher
//! - `dispatch_failures_total` (counter): failures caught at the dispatch boundary, by kind
//! - `module_load_total` (counter): module hook runs by hook and result
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no-ops until an exporter is installed
//! - Route patterns are not used as labels to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// How a single dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unmatched,
    StoppedEarly,
    Responded,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Unmatched => "unmatched",
            Outcome::StoppedEarly => "stopped_early",
            Outcome::Responded => "responded",
            Outcome::Failed => "failed",
        }
    }
}

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(outcome: Outcome, start: Instant) {
    metrics::counter!("dispatch_requests_total", "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!("dispatch_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("dispatch_failures_total", "kind" => kind).increment(1);
}

pub fn record_module_hook(hook: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "failed" };
    metrics::counter!("module_load_total", "hook" => hook, "result" => result).increment(1);
}
