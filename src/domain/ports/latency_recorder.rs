//! Latency Recorder Port
//!
//! Defines the interface for feeding request latencies into a quantile summary.

use std::time::Duration;

/// Sink for per-request latency observations.
///
/// Each `(endpoint, method, bucket)` triple maps to one summary. Callers
/// must keep every label drawn from a bounded set (configured endpoints,
/// HTTP verbs, first path segment); unbounded label values blow up the
/// number of time series in the downstream metric store.
pub trait LatencyRecorder: Send + Sync {
    /// Record one observed request latency.
    fn observe(&self, endpoint: &str, method: &str, bucket: &str, latency: Duration);
}
