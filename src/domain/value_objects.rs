//! Value Objects - Immutable domain primitives
//!
//! Status-code ranges, failure-count batches and the bucket label
//! derived from a request path.

/// First HTTP status code tracked as a failure (400 Bad Request).
pub const FIRST_FAILURE_STATUS: u16 = 400;

/// Last HTTP status code tracked as a failure (511 Network Authentication Required).
pub const LAST_FAILURE_STATUS: u16 = 511;

/// Number of distinct failure status codes in `[400, 511]`.
pub const FAILURE_STATUS_SLOTS: usize = (LAST_FAILURE_STATUS - FIRST_FAILURE_STATUS + 1) as usize;

/// Map a failure status code to its slot index.
///
/// # Panics
/// Panics if `status` lies outside `[400, 511]`; such a code is a caller bug
/// and is never clamped.
#[inline]
pub fn failure_slot(status: u16) -> usize {
    assert!(
        (FIRST_FAILURE_STATUS..=LAST_FAILURE_STATUS).contains(&status),
        "status code {} outside tracked failure range [{}, {}]",
        status,
        FIRST_FAILURE_STATUS,
        LAST_FAILURE_STATUS
    );
    (status - FIRST_FAILURE_STATUS) as usize
}

/// Inverse of [`failure_slot`].
#[inline]
pub fn status_for_slot(slot: usize) -> u16 {
    debug_assert!(slot < FAILURE_STATUS_SLOTS);
    FIRST_FAILURE_STATUS + slot as u16
}

/// Absolute failure counts per status code, as handed over by the proxy core.
///
/// Used as the argument of `ConnStats::set_total_call_failures`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCounts {
    counts: [u64; FAILURE_STATUS_SLOTS],
}

impl FailureCounts {
    /// All slots zero.
    pub fn new() -> Self {
        Self {
            counts: [0; FAILURE_STATUS_SLOTS],
        }
    }

    /// Build directly from a slot-indexed array (`status - 400`).
    pub fn from_slots(counts: [u64; FAILURE_STATUS_SLOTS]) -> Self {
        Self { counts }
    }

    /// Set the count for one status code.
    ///
    /// # Panics
    /// Panics if `status` lies outside `[400, 511]`.
    pub fn set(&mut self, status: u16, count: u64) {
        self.counts[failure_slot(status)] = count;
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, status: u16, count: u64) -> Self {
        self.set(status, count);
        self
    }

    /// Count for one status code.
    ///
    /// # Panics
    /// Panics if `status` lies outside `[400, 511]`.
    pub fn get(&self, status: u16) -> u64 {
        self.counts[failure_slot(status)]
    }

    /// Raw slot-indexed view.
    pub fn as_slots(&self) -> &[u64; FAILURE_STATUS_SLOTS] {
        &self.counts
    }
}

impl Default for FailureCounts {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the bucket label from a request path.
///
/// Skips leading `/` characters and returns everything up to the next `/`.
/// Only the first segment is kept, which keeps the label low-cardinality;
/// object keys and deeper segments are dropped.
///
/// # Examples
/// ```
/// use edge_stats::bucket_from_path;
///
/// assert_eq!(bucket_from_path("/core-data/Cheques/dbo__cheques"), "core-data");
/// assert_eq!(bucket_from_path("/"), "");
/// ```
pub fn bucket_from_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    // ===== bucket_from_path Tests =====

    #[test]
    fn test_bucket_from_path_cases() {
        let tests = vec![
            ("", ""),
            ("/", ""),
            ("///", ""),
            ("/core-data/Cheques/dbo__cheques", "core-data"),
            ("noleadingslash/x", "noleadingslash"),
            ("//double/leading", "double"),
            ("/bucket", "bucket"),
            ("/bucket/", "bucket"),
        ];

        for (input, expected) in tests {
            assert_eq!(bucket_from_path(input), expected, "input: {:?}", input);
        }
    }

    #[test]
    fn test_bucket_from_path_keeps_non_ascii() {
        assert_eq!(bucket_from_path("/dépôt/objet"), "dépôt");
    }

    // ===== Failure Slot Tests =====

    #[test]
    fn test_failure_slot_bounds() {
        assert_eq!(failure_slot(400), 0);
        assert_eq!(failure_slot(511), FAILURE_STATUS_SLOTS - 1);
        assert_eq!(FAILURE_STATUS_SLOTS, 112);
    }

    #[test]
    fn test_status_for_slot_roundtrip() {
        for status in FIRST_FAILURE_STATUS..=LAST_FAILURE_STATUS {
            assert_eq!(status_for_slot(failure_slot(status)), status);
        }
    }

    #[test]
    #[should_panic(expected = "outside tracked failure range")]
    fn test_failure_slot_below_range_panics() {
        failure_slot(399);
    }

    #[test]
    #[should_panic(expected = "outside tracked failure range")]
    fn test_failure_slot_above_range_panics() {
        failure_slot(512);
    }

    // ===== FailureCounts Tests =====

    #[test]
    fn test_failure_counts_default_is_zero() {
        let counts = FailureCounts::default();
        assert!(counts.as_slots().iter().all(|c| *c == 0));
    }

    #[test]
    fn test_failure_counts_set_get() {
        let counts = FailureCounts::new().with(404, 7).with(503, 2);
        assert_eq!(counts.get(404), 7);
        assert_eq!(counts.get(503), 2);
        assert_eq!(counts.get(500), 0);
        assert_eq!(counts.as_slots()[4], 7);
    }

    #[test]
    #[should_panic]
    fn test_failure_counts_set_out_of_range_panics() {
        let mut counts = FailureCounts::new();
        counts.set(200, 1);
    }
}
