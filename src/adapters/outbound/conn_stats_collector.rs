//! ConnStats Collector
//!
//! Exposes the per-endpoint counters of a StatsRegistry as a SnapshotProvider.

use crate::domain::entities::StatsRegistry;
use crate::domain::ports::{MetricDescriptor, MetricKind, MetricSample, SnapshotProvider};
use std::sync::Arc;

/// Fully-qualified names of the per-endpoint counter families.
#[derive(Debug, Clone)]
struct FamilyNames {
    calls: String,
    errors: String,
    rx_bytes: String,
    tx_bytes: String,
}

impl FamilyNames {
    fn new(namespace: &str) -> Self {
        Self {
            calls: format!("{}_requests_total", namespace),
            errors: format!("{}_errors_total", namespace),
            rx_bytes: format!("{}_rx_bytes_total", namespace),
            tx_bytes: format!("{}_tx_bytes_total", namespace),
        }
    }
}

/// Snapshot provider over every populated slot of a StatsRegistry.
///
/// Per endpoint it emits total calls, received bytes, sent bytes and one
/// failure counter per status code with a non-zero count. Values are read
/// with independent atomic loads; a snapshot is not consistent across
/// fields.
pub struct ConnStatsCollector {
    registry: Arc<StatsRegistry>,
    names: FamilyNames,
}

impl ConnStatsCollector {
    pub fn new(registry: Arc<StatsRegistry>, namespace: &str) -> Self {
        Self {
            registry,
            names: FamilyNames::new(namespace),
        }
    }
}

impl SnapshotProvider for ConnStatsCollector {
    fn describe(&self) -> Vec<MetricDescriptor> {
        vec![
            MetricDescriptor::new(
                self.names.calls.clone(),
                "Total number of calls per backend endpoint",
                MetricKind::Counter,
                vec!["endpoint"],
            ),
            MetricDescriptor::new(
                self.names.errors.clone(),
                "Total number of failed calls per backend endpoint and status code",
                MetricKind::Counter,
                vec!["endpoint", "status_code"],
            ),
            MetricDescriptor::new(
                self.names.rx_bytes.clone(),
                "Total number of bytes received per backend endpoint",
                MetricKind::Counter,
                vec!["endpoint"],
            ),
            MetricDescriptor::new(
                self.names.tx_bytes.clone(),
                "Total number of bytes sent per backend endpoint",
                MetricKind::Counter,
                vec!["endpoint"],
            ),
        ]
    }

    fn collect(&self) -> Vec<MetricSample> {
        let mut samples = Vec::with_capacity(self.registry.len() * 3);

        for stats in self.registry.iter() {
            let endpoint = stats.endpoint();

            samples.push(MetricSample::counter(
                &self.names.calls,
                vec![endpoint.to_string()],
                stats.total_calls() as f64,
            ));

            for (status, count) in stats.failures() {
                samples.push(MetricSample::counter(
                    &self.names.errors,
                    vec![endpoint.to_string(), status.to_string()],
                    count as f64,
                ));
            }

            samples.push(MetricSample::counter(
                &self.names.rx_bytes,
                vec![endpoint.to_string()],
                stats.total_input_bytes() as f64,
            ));
            samples.push(MetricSample::counter(
                &self.names.tx_bytes,
                vec![endpoint.to_string()],
                stats.total_output_bytes() as f64,
            ));
        }

        tracing::trace!(samples = samples.len(), "collected connection stats");
        samples
    }
}
