//! HdrHistogram Latency Recorder
//!
//! Implements LatencyRecorder with one decaying quantile summary per
//! `(endpoint, method, bucket)` triple, and exposes the summaries through
//! SnapshotProvider.

use crate::domain::ports::{
    LatencyRecorder, MetricDescriptor, MetricKind, MetricSample, SampleValue, SnapshotProvider,
};
use crate::error::{ExportError, Result};
use dashmap::DashMap;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Quantiles reported for every summary.
pub const SUMMARY_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Observations older than this drop out of the quantile window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);

/// Number of overlapping windows the max age is split into.
pub const DEFAULT_AGE_BUCKETS: usize = 5;

/// Longest accepted max age.
pub const MAX_SUMMARY_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Most windows a summary may be split into; each one is a histogram.
pub const MAX_AGE_BUCKETS: usize = 1024;

/// 3 significant digits keeps the relative value error at 0.1%.
const SIGNIFICANT_DIGITS: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LatencyKey {
    endpoint: String,
    method: String,
    bucket: String,
}

/// Streaming summary for one label triple.
///
/// Every observation goes into all `windows`; quantiles are read from the
/// head window, which is reset and rotated out every `window_len`. The head
/// therefore always covers between `max_age - window_len` and `max_age` of
/// history.
struct Summary {
    windows: Vec<Histogram<u64>>,
    head: usize,
    head_expires: Instant,
    window_len: Duration,
    max_age: Duration,
    count: u64,
    sum: f64,
}

impl Summary {
    fn new(template: &Histogram<u64>, age_buckets: usize, window_len: Duration, now: Instant) -> Self {
        Self {
            windows: vec![template.clone(); age_buckets],
            head: 0,
            head_expires: now + window_len,
            window_len,
            max_age: window_len * age_buckets as u32,
            count: 0,
            sum: 0.0,
        }
    }

    fn observe(&mut self, nanos: u64, now: Instant) {
        self.rotate(now);
        for window in &mut self.windows {
            // Windows auto-resize; only a failed resize ends up clamped.
            if window.record(nanos).is_err() {
                window.saturating_record(nanos);
            }
        }
        self.count += 1;
        self.sum += nanos as f64;
    }

    fn rotate(&mut self, now: Instant) {
        if now < self.head_expires {
            return;
        }

        if now.duration_since(self.head_expires) >= self.max_age {
            // Idle for longer than the whole window: everything is stale.
            for window in &mut self.windows {
                window.reset();
            }
            self.head_expires = now + self.window_len;
            return;
        }

        while now >= self.head_expires {
            self.windows[self.head].reset();
            self.head = (self.head + 1) % self.windows.len();
            self.head_expires += self.window_len;
        }
    }

    fn snapshot(&mut self, now: Instant) -> SampleValue {
        self.rotate(now);
        let head = &self.windows[self.head];
        let quantiles = SUMMARY_QUANTILES
            .iter()
            .map(|q| {
                let value = if head.len() == 0 {
                    f64::NAN
                } else {
                    head.value_at_quantile(*q) as f64
                };
                (*q, value)
            })
            .collect();

        SampleValue::Summary {
            count: self.count,
            sum: self.sum,
            quantiles,
        }
    }
}

/// Latency summaries keyed by `(endpoint, method, bucket)`.
///
/// The label map is a DashMap; each summary has its own short critical
/// section, so writers on different keys never contend.
pub struct HdrLatencyRecorder {
    summaries: DashMap<LatencyKey, Arc<Mutex<Summary>>>,
    template: Histogram<u64>,
    age_buckets: usize,
    window_len: Duration,
    metric_name: String,
}

impl HdrLatencyRecorder {
    /// Create a recorder with the default decay (10 minutes over 5 windows).
    pub fn new(namespace: &str) -> Result<Self> {
        Self::with_decay(namespace, DEFAULT_MAX_AGE, DEFAULT_AGE_BUCKETS)
    }

    /// Create a recorder whose quantiles cover roughly the last `max_age`.
    ///
    /// Fails if `max_age` exceeds [`MAX_SUMMARY_AGE`] or `age_buckets`
    /// exceeds [`MAX_AGE_BUCKETS`]. Zero buckets means one.
    pub fn with_decay(namespace: &str, max_age: Duration, age_buckets: usize) -> Result<Self> {
        if max_age > MAX_SUMMARY_AGE {
            return Err(ExportError::Decay(format!(
                "max age {:?} exceeds {:?}",
                max_age, MAX_SUMMARY_AGE
            )));
        }
        if age_buckets > MAX_AGE_BUCKETS {
            return Err(ExportError::Decay(format!(
                "{} age buckets exceeds {}",
                age_buckets, MAX_AGE_BUCKETS
            )));
        }

        let age_buckets = age_buckets.max(1);
        let window_len = (max_age / age_buckets as u32).max(Duration::from_millis(1));
        let template = Histogram::<u64>::new(SIGNIFICANT_DIGITS)?;

        Ok(Self {
            summaries: DashMap::new(),
            template,
            age_buckets,
            window_len,
            metric_name: format!("{}_requests_latency", namespace),
        })
    }

    /// Total observations recorded for a label triple.
    pub fn summary_count(&self, endpoint: &str, method: &str, bucket: &str) -> Option<u64> {
        let key = LatencyKey {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            bucket: bucket.to_string(),
        };
        let summary = self.summaries.get(&key).map(|e| e.value().clone())?;
        let count = summary.lock().count;
        Some(count)
    }

    /// Number of distinct label triples seen so far.
    pub fn series_count(&self) -> usize {
        self.summaries.len()
    }

    fn summary_for(&self, key: LatencyKey) -> Arc<Mutex<Summary>> {
        if let Some(existing) = self.summaries.get(&key) {
            return existing.value().clone();
        }
        self.summaries
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Summary::new(
                    &self.template,
                    self.age_buckets,
                    self.window_len,
                    Instant::now(),
                )))
            })
            .value()
            .clone()
    }
}

impl LatencyRecorder for HdrLatencyRecorder {
    fn observe(&self, endpoint: &str, method: &str, bucket: &str, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        let summary = self.summary_for(LatencyKey {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            bucket: bucket.to_string(),
        });
        summary.lock().observe(nanos, Instant::now());
    }
}

impl SnapshotProvider for HdrLatencyRecorder {
    fn describe(&self) -> Vec<MetricDescriptor> {
        vec![MetricDescriptor::new(
            self.metric_name.clone(),
            "HTTP requests latency in nanoseconds per endpoint, method and bucket",
            MetricKind::Summary,
            vec!["endpoint", "method", "bucket"],
        )]
    }

    fn collect(&self) -> Vec<MetricSample> {
        // Clone the handles first so no map shard stays locked while
        // summaries are being read.
        let entries: Vec<(LatencyKey, Arc<Mutex<Summary>>)> = self
            .summaries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let now = Instant::now();
        entries
            .into_iter()
            .map(|(key, summary)| {
                let value = summary.lock().snapshot(now);
                MetricSample {
                    name: self.metric_name.clone(),
                    label_values: vec![key.endpoint, key.method, key.bucket],
                    value,
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn summary_of(samples: &[MetricSample], labels: [&str; 3]) -> (u64, f64, Vec<(f64, f64)>) {
        let sample = samples
            .iter()
            .find(|s| s.label_values == labels.map(String::from).to_vec())
            .expect("sample present");
        match &sample.value {
            SampleValue::Summary { count, sum, quantiles } => (*count, *sum, quantiles.clone()),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_new_is_empty() {
        let recorder = HdrLatencyRecorder::new("edgeproxy").unwrap();
        assert_eq!(recorder.series_count(), 0);
        assert!(recorder.collect().is_empty());
        assert!(recorder.summary_count("a", "GET", "b").is_none());
    }

    #[test]
    fn test_describe_is_static() {
        let recorder = HdrLatencyRecorder::new("edgeproxy").unwrap();
        let before = recorder.describe();
        recorder.observe("a", "GET", "b", Duration::from_millis(1));
        assert_eq!(before, recorder.describe());

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].name, "edgeproxy_requests_latency");
        assert_eq!(before[0].kind, MetricKind::Summary);
        assert_eq!(before[0].label_names, vec!["endpoint", "method", "bucket"]);
    }

    #[test]
    fn test_observe_keys_by_label_triple() {
        let recorder = HdrLatencyRecorder::new("edgeproxy").unwrap();

        recorder.observe("a:9000", "GET", "photos", Duration::from_millis(1));
        recorder.observe("a:9000", "GET", "photos", Duration::from_millis(2));
        recorder.observe("a:9000", "PUT", "photos", Duration::from_millis(3));
        recorder.observe("b:9000", "GET", "", Duration::from_millis(4));

        assert_eq!(recorder.series_count(), 3);
        assert_eq!(recorder.summary_count("a:9000", "GET", "photos"), Some(2));
        assert_eq!(recorder.summary_count("a:9000", "PUT", "photos"), Some(1));
        assert_eq!(recorder.summary_count("b:9000", "GET", ""), Some(1));
    }

    #[test]
    fn test_quantiles_within_precision() {
        let recorder = HdrLatencyRecorder::new("edgeproxy").unwrap();
        for ms in 1..=1000u64 {
            recorder.observe("a", "GET", "b", Duration::from_millis(ms));
        }

        let samples = recorder.collect();
        let (count, sum, quantiles) = summary_of(&samples, ["a", "GET", "b"]);
        assert_eq!(count, 1000);
        assert!((sum - 500_500_000_000.0).abs() < 1.0);

        for (q, value) in quantiles {
            let expected = q * 1_000_000_000.0;
            let error = (value - expected).abs() / expected;
            assert!(error < 0.01, "q={} value={} expected={}", q, value, expected);
        }
    }

    #[test]
    fn test_single_observation_quantiles() {
        let recorder = HdrLatencyRecorder::new("edgeproxy").unwrap();
        recorder.observe("a", "GET", "b", Duration::from_millis(250));

        let samples = recorder.collect();
        let (count, sum, quantiles) = summary_of(&samples, ["a", "GET", "b"]);
        assert_eq!(count, 1);
        assert_eq!(sum, 250_000_000.0);
        for (q, value) in quantiles {
            let error = (value - 250_000_000.0).abs() / 250_000_000.0;
            assert!(error < 0.001, "q={} value={}", q, value);
        }
    }

    #[test]
    fn test_decay_rejects_too_many_buckets() {
        let result = HdrLatencyRecorder::with_decay("edgeproxy", DEFAULT_MAX_AGE, MAX_AGE_BUCKETS + 1);
        assert!(matches!(result, Err(ExportError::Decay(_))));

        let result = HdrLatencyRecorder::with_decay("edgeproxy", DEFAULT_MAX_AGE, usize::MAX);
        assert!(matches!(result, Err(ExportError::Decay(_))));

        #[cfg(target_pointer_width = "64")]
        {
            let wrapping = u32::MAX as usize + 1;
            let result = HdrLatencyRecorder::with_decay("edgeproxy", DEFAULT_MAX_AGE, wrapping);
            assert!(matches!(result, Err(ExportError::Decay(_))));
        }
    }

    #[test]
    fn test_decay_rejects_huge_max_age() {
        let result = HdrLatencyRecorder::with_decay("edgeproxy", Duration::from_secs(u64::MAX), 1);
        assert!(matches!(result, Err(ExportError::Decay(_))));

        let result =
            HdrLatencyRecorder::with_decay("edgeproxy", MAX_SUMMARY_AGE + Duration::from_secs(1), 5);
        assert!(matches!(result, Err(ExportError::Decay(_))));
    }

    #[test]
    fn test_decay_limits_accepted() {
        let recorder =
            HdrLatencyRecorder::with_decay("edgeproxy", MAX_SUMMARY_AGE, MAX_AGE_BUCKETS).unwrap();
        recorder.observe("a", "GET", "b", Duration::from_millis(5));
        assert_eq!(recorder.collect().len(), 1);

        let recorder = HdrLatencyRecorder::with_decay("edgeproxy", MAX_SUMMARY_AGE, 1).unwrap();
        recorder.observe("a", "GET", "b", Duration::from_millis(5));
        assert_eq!(recorder.summary_count("a", "GET", "b"), Some(1));
    }

    #[test]
    fn test_zero_buckets_means_one() {
        let recorder = HdrLatencyRecorder::with_decay("edgeproxy", DEFAULT_MAX_AGE, 0).unwrap();
        assert_eq!(recorder.age_buckets, 1);
    }

    #[test]
    fn test_zero_latency_recorded() {
        let recorder = HdrLatencyRecorder::new("edgeproxy").unwrap();
        recorder.observe("a", "GET", "b", Duration::ZERO);
        assert_eq!(recorder.summary_count("a", "GET", "b"), Some(1));
    }

    #[test]
    fn test_window_expiry_keeps_count_and_sum() {
        let recorder =
            HdrLatencyRecorder::with_decay("edgeproxy", Duration::from_millis(20), 2).unwrap();
        recorder.observe("a", "GET", "b", Duration::from_micros(10));

        std::thread::sleep(Duration::from_millis(60));

        let samples = recorder.collect();
        let (count, sum, quantiles) = summary_of(&samples, ["a", "GET", "b"]);
        assert_eq!(count, 1);
        assert_eq!(sum, 10_000.0);
        assert!(quantiles.iter().all(|(_, v)| v.is_nan()));
    }

    #[test]
    fn test_rotation_drops_old_observations() {
        let template = Histogram::<u64>::new(SIGNIFICANT_DIGITS).unwrap();
        let start = Instant::now();
        let mut summary = Summary::new(&template, 2, Duration::from_secs(10), start);

        summary.observe(1_000, start);
        summary.observe(5_000, start + Duration::from_secs(11));

        // One rotation in: the head window still holds both values.
        match summary.snapshot(start + Duration::from_secs(11)) {
            SampleValue::Summary { quantiles, count, .. } => {
                assert_eq!(count, 2);
                assert!(quantiles.iter().all(|(_, v)| !v.is_nan()));
            }
            other => panic!("unexpected value {:?}", other),
        }

        // After a second rotation the first observation is gone.
        match summary.snapshot(start + Duration::from_secs(21)) {
            SampleValue::Summary { quantiles, .. } => {
                for (_, v) in quantiles {
                    assert!((v - 5_000.0).abs() / 5_000.0 < 0.01);
                }
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_concurrent_observe_and_collect() {
        use std::thread;

        let recorder = Arc::new(HdrLatencyRecorder::new("edgeproxy").unwrap());
        let mut handles = vec![];

        for t in 0..10 {
            let r = recorder.clone();
            handles.push(thread::spawn(move || {
                for i in 0..1000u64 {
                    r.observe("a", "GET", "b", Duration::from_nanos(t * 1000 + i + 1));
                }
            }));
        }
        for _ in 0..100 {
            let r = recorder.clone();
            handles.push(thread::spawn(move || {
                let _ = r.collect();
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(recorder.summary_count("a", "GET", "b"), Some(10_000));
    }
}
