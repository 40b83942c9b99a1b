//! Stats Reporter - Producer API for the proxy core
//!
//! The request-handling path calls `report` once per completed request
//! with values it has already extracted; this service fans them out to the
//! endpoint's ConnStats record and the latency summary.

use crate::domain::entities::{ConnStats, StatsRegistry};
use crate::domain::ports::LatencyRecorder;
use crate::domain::value_objects::{bucket_from_path, FailureCounts};
use std::sync::Arc;
use std::time::Duration;

/// Scalar values describing one completed request and the endpoint's totals.
///
/// Byte and call counts are absolute totals for the endpoint, not deltas.
#[derive(Debug, Clone, Default)]
pub struct RequestReport {
    pub total_input_bytes: u64,
    pub total_output_bytes: u64,
    pub total_calls: u64,
    pub failures: FailureCounts,
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// HTTP method of the request
    pub method: String,
    /// Request path; only its first segment is used as a label
    pub path: String,
    /// Observed latency of this request
    pub latency: Duration,
}

/// Producer-side facade over the registry and the latency recorder.
pub struct StatsReporter {
    registry: Arc<StatsRegistry>,
    latency: Arc<dyn LatencyRecorder>,
}

impl StatsReporter {
    pub fn new(registry: Arc<StatsRegistry>, latency: Arc<dyn LatencyRecorder>) -> Self {
        Self { registry, latency }
    }

    pub fn registry(&self) -> &Arc<StatsRegistry> {
        &self.registry
    }

    /// Apply a completed request to the endpoint in `slot`.
    ///
    /// Returns false if the slot is empty or out of range; nothing is
    /// recorded in that case.
    pub fn report(&self, slot: usize, report: &RequestReport) -> bool {
        match self.registry.get(slot) {
            Some(stats) => {
                self.apply(stats, report);
                true
            }
            None => {
                tracing::debug!(slot, "no stats record for slot, dropping report");
                false
            }
        }
    }

    /// Same as [`report`](Self::report), looking the endpoint up by name.
    pub fn report_endpoint(&self, endpoint: &str, report: &RequestReport) -> bool {
        match self.registry.find(endpoint) {
            Some(stats) => {
                self.apply(stats, report);
                true
            }
            None => {
                tracing::debug!(endpoint, "unknown endpoint, dropping report");
                false
            }
        }
    }

    /// Record one request latency for an endpoint, labelled with the
    /// bucket taken from `path`.
    pub fn observe_latency(&self, endpoint: &str, method: &str, path: &str, latency: Duration) {
        let bucket = bucket_from_path(path);
        self.latency.observe(endpoint, method, &bucket, latency);
    }

    fn apply(&self, stats: &ConnStats, report: &RequestReport) {
        stats.set_input_bytes(report.total_input_bytes);
        stats.set_output_bytes(report.total_output_bytes);
        stats.set_total_calls(report.total_calls);
        stats.set_total_call_failures(&report.failures);
        stats.set_min_latency(report.min_latency);
        stats.set_max_latency(report.max_latency);
        self.observe_latency(stats.endpoint(), &report.method, &report.path, report.latency);
    }
}
