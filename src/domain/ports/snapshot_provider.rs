//! Snapshot Provider Port
//!
//! The describe/collect capability consumed by the exporter on every scrape.

/// Kind of metric a descriptor announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Summary,
}

/// Static description of one metric family.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    /// Fully-qualified metric name (`<namespace>_<subsystem>_<name>`)
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    /// Label names, in the order samples carry their values
    pub label_names: Vec<&'static str>,
}

impl MetricDescriptor {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        label_names: Vec<&'static str>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            label_names,
        }
    }
}

/// Value carried by a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Counter(f64),
    Summary {
        count: u64,
        sum: f64,
        /// `(quantile, value)` pairs
        quantiles: Vec<(f64, f64)>,
    },
}

/// One labeled observation of a described metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Name of the descriptor this sample belongs to
    pub name: String,
    /// Label values, matching the descriptor's `label_names` order
    pub label_values: Vec<String>,
    pub value: SampleValue,
}

impl MetricSample {
    pub fn counter(name: &str, label_values: Vec<String>, value: f64) -> Self {
        Self {
            name: name.to_string(),
            label_values,
            value: SampleValue::Counter(value),
        }
    }
}

/// Source of a point-in-time metric snapshot.
///
/// `describe` must not touch live data and must return the same set on
/// every call. `collect` runs once per scrape, concurrently with writers and
/// with other scrapes, and cannot fail.
pub trait SnapshotProvider: Send + Sync {
    /// Every metric family this provider can emit.
    fn describe(&self) -> Vec<MetricDescriptor>;

    /// Current samples. Samples naming an undescribed metric are dropped.
    fn collect(&self) -> Vec<MetricSample>;
}
