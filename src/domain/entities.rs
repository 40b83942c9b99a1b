//! Domain Entities - Core business objects
//!
//! `ConnStats` holds the statistics of one backend endpoint and
//! `StatsRegistry` is the fixed set of those records built at startup.

use crate::domain::value_objects::{
    failure_slot, status_for_slot, FailureCounts, FAILURE_STATUS_SLOTS,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Statistics for a single backend endpoint.
///
/// Every field is an independent atomic. Setters store absolute values
/// (last writer wins), so a reader may see `total_calls` from one update
/// and `total_input_bytes` from the next one.
#[derive(Debug)]
pub struct ConnStats {
    endpoint: String,
    total_input_bytes: AtomicU64,
    total_output_bytes: AtomicU64,
    total_calls: AtomicU64,
    /// Indexed by `status - 400`
    total_failed_calls: [AtomicU64; FAILURE_STATUS_SLOTS],
    /// Nanoseconds
    min_latency: AtomicU64,
    /// Nanoseconds
    max_latency: AtomicU64,
}

impl ConnStats {
    /// Create a zero-valued record for an endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            total_input_bytes: AtomicU64::new(0),
            total_output_bytes: AtomicU64::new(0),
            total_calls: AtomicU64::new(0),
            total_failed_calls: std::array::from_fn(|_| AtomicU64::new(0)),
            min_latency: AtomicU64::new(0),
            max_latency: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Store current total input bytes.
    pub fn set_input_bytes(&self, n: u64) {
        self.total_input_bytes.store(n, Ordering::Relaxed);
    }

    /// Store current total output bytes.
    pub fn set_output_bytes(&self, n: u64) {
        self.total_output_bytes.store(n, Ordering::Relaxed);
    }

    /// Store current total calls.
    pub fn set_total_calls(&self, n: u64) {
        self.total_calls.store(n, Ordering::Relaxed);
    }

    /// Store current failure counts for every tracked status code.
    ///
    /// Each slot is stored on its own; a concurrent reader may observe a
    /// partially applied batch.
    pub fn set_total_call_failures(&self, counts: &FailureCounts) {
        for (slot, value) in counts.as_slots().iter().enumerate() {
            self.total_failed_calls[slot].store(*value, Ordering::Relaxed);
        }
    }

    /// Replace the min latency bound.
    ///
    /// This is the value the caller observed, not a running minimum.
    pub fn set_min_latency(&self, d: Duration) {
        self.min_latency.store(duration_nanos(d), Ordering::Relaxed);
    }

    /// Replace the max latency bound.
    pub fn set_max_latency(&self, d: Duration) {
        self.max_latency.store(duration_nanos(d), Ordering::Relaxed);
    }

    pub fn total_input_bytes(&self) -> u64 {
        self.total_input_bytes.load(Ordering::Relaxed)
    }

    pub fn total_output_bytes(&self) -> u64 {
        self.total_output_bytes.load(Ordering::Relaxed)
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    /// Failure count for one status code.
    ///
    /// # Panics
    /// Panics if `status` lies outside `[400, 511]`.
    pub fn failed_calls(&self, status: u16) -> u64 {
        self.total_failed_calls[failure_slot(status)].load(Ordering::Relaxed)
    }

    /// Non-zero failure counts as `(status, count)` pairs, in status order.
    pub fn failures(&self) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.total_failed_calls
            .iter()
            .enumerate()
            .filter_map(|(slot, counter)| {
                let value = counter.load(Ordering::Relaxed);
                (value > 0).then(|| (status_for_slot(slot), value))
            })
    }

    pub fn min_latency(&self) -> Duration {
        Duration::from_nanos(self.min_latency.load(Ordering::Relaxed))
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_nanos(self.max_latency.load(Ordering::Relaxed))
    }
}

/// Saturate at `u64::MAX` nanoseconds (~584 years).
fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Fixed set of per-endpoint statistics records.
///
/// Slots are populated once at startup and never resized. A slot may be
/// empty (`None`), e.g. for a backend that is configured but disabled;
/// iteration skips it.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    slots: Vec<Option<Arc<ConnStats>>>,
}

impl StatsRegistry {
    /// One populated slot per endpoint, in the given order.
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: endpoints
                .into_iter()
                .map(|e| Some(Arc::new(ConnStats::new(e))))
                .collect(),
        }
    }

    /// Build from pre-made slots, including empty ones.
    pub fn from_slots(slots: Vec<Option<Arc<ConnStats>>>) -> Self {
        Self { slots }
    }

    /// Record at a slot index, if populated.
    pub fn get(&self, index: usize) -> Option<&Arc<ConnStats>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Record for an endpoint name.
    pub fn find(&self, endpoint: &str) -> Option<&Arc<ConnStats>> {
        self.iter().find(|s| s.endpoint() == endpoint)
    }

    /// Populated records, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConnStats>> {
        self.slots.iter().flatten()
    }

    /// Number of slots, including empty ones.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
