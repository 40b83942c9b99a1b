//! Prometheus Exporter
//!
//! Adapts SnapshotProviders into `prometheus` collectors and renders the
//! text exposition format.

use crate::domain::ports::{MetricDescriptor, MetricKind, MetricSample, SampleValue, SnapshotProvider};
use crate::error::{ExportError, Result};
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// `prometheus::core::Collector` over a SnapshotProvider.
///
/// Descriptors are validated once, when the collector is built. Each
/// `collect` turns the provider's samples into metric families in
/// descriptor order; families without samples are pruned by the registry.
pub struct ProviderCollector {
    provider: Arc<dyn SnapshotProvider>,
    descriptors: Vec<MetricDescriptor>,
    descs: Vec<Desc>,
}

impl ProviderCollector {
    pub fn new(provider: Arc<dyn SnapshotProvider>) -> Result<Self> {
        let descriptors = provider.describe();
        let descs = descriptors
            .iter()
            .map(|d| {
                Desc::new(
                    d.name.clone(),
                    d.help.clone(),
                    d.label_names.iter().map(|l| l.to_string()).collect(),
                    HashMap::new(),
                )
                .map_err(|source| ExportError::Descriptor {
                    name: d.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            provider,
            descriptors,
            descs,
        })
    }

    fn build_metric(descriptor: &MetricDescriptor, sample: MetricSample) -> Option<proto::Metric> {
        if sample.label_values.len() != descriptor.label_names.len() {
            tracing::warn!(
                metric = %descriptor.name,
                expected = descriptor.label_names.len(),
                got = sample.label_values.len(),
                "dropping sample with wrong label count"
            );
            return None;
        }

        let mut metric = proto::Metric::default();

        let mut labels: Vec<_> = descriptor
            .label_names
            .iter()
            .zip(sample.label_values)
            .collect();
        labels.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in labels {
            let mut pair = proto::LabelPair::default();
            pair.set_name(name.to_string());
            pair.set_value(value);
            metric.mut_label().push(pair);
        }

        match (descriptor.kind, sample.value) {
            (MetricKind::Counter, SampleValue::Counter(value)) => {
                let mut counter = proto::Counter::default();
                counter.set_value(value);
                metric.set_counter(counter);
            }
            (MetricKind::Summary, SampleValue::Summary { count, sum, quantiles }) => {
                let mut summary = proto::Summary::default();
                summary.set_sample_count(count);
                summary.set_sample_sum(sum);
                for (q, value) in quantiles {
                    let mut quantile = proto::Quantile::default();
                    quantile.set_quantile(q);
                    quantile.set_value(value);
                    summary.mut_quantile().push(quantile);
                }
                metric.set_summary(summary);
            }
            (kind, _) => {
                tracing::warn!(metric = %descriptor.name, ?kind, "dropping sample of mismatched kind");
                return None;
            }
        }

        Some(metric)
    }
}

impl Collector for ProviderCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families: Vec<MetricFamily> = self
            .descriptors
            .iter()
            .map(|d| {
                let mut family = MetricFamily::default();
                family.set_name(d.name.clone());
                family.set_help(d.help.clone());
                family.set_field_type(match d.kind {
                    MetricKind::Counter => MetricType::COUNTER,
                    MetricKind::Summary => MetricType::SUMMARY,
                });
                family
            })
            .collect();

        let index: HashMap<&str, usize> = self
            .descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.as_str(), i))
            .collect();

        for sample in self.provider.collect() {
            let Some(&i) = index.get(sample.name.as_str()) else {
                tracing::debug!(metric = %sample.name, "dropping sample of undescribed metric");
                continue;
            };
            if let Some(metric) = Self::build_metric(&self.descriptors[i], sample) {
                families[i].mut_metric().push(metric);
            }
        }

        families
    }
}

/// Owns the exporter's metric registry and renders scrapes.
///
/// A scrape gathers this registry and, unless disabled, the process-wide
/// default registry (process metrics and anything registered globally).
pub struct PrometheusExporter {
    registry: Registry,
    include_default: bool,
}

impl PrometheusExporter {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            include_default: true,
        }
    }

    /// Leave the process-wide default registry out of scrapes.
    pub fn without_default_registry(mut self) -> Self {
        self.include_default = false;
        self
    }

    /// Register a snapshot provider.
    ///
    /// Fails on invalid descriptors and on metric names that are already
    /// registered. Both are startup errors.
    pub fn register(&self, provider: Arc<dyn SnapshotProvider>) -> Result<()> {
        let collector = ProviderCollector::new(provider)?;
        let names: Vec<String> = collector
            .descriptors
            .iter()
            .map(|d| d.name.clone())
            .collect();

        self.registry
            .register(Box::new(collector))
            .map_err(ExportError::Registration)?;

        tracing::info!(metrics = ?names, "registered snapshot provider");
        Ok(())
    }

    /// Registry for additional metrics, e.g. scrape instrumentation.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gather all metric families for one scrape.
    ///
    /// Families from the default registry whose name clashes with one of
    /// ours are dropped.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let mut families = self.registry.gather();
        if self.include_default {
            let ours: HashSet<String> = families.iter().map(|f| f.get_name().to_string()).collect();
            for family in prometheus::gather() {
                if ours.contains(family.get_name()) {
                    tracing::warn!(metric = family.get_name(), "skipping duplicate default metric");
                    continue;
                }
                families.push(family);
            }
        }
        families
    }

    /// Render a scrape in the text exposition format.
    ///
    /// Each family is encoded on its own; a family that fails to encode is
    /// logged and left out, the rest are still rendered.
    pub fn encode_text(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let mut out = Vec::with_capacity(16 * 1024);

        for family in self.gather() {
            let mut buf = Vec::new();
            match encoder.encode(std::slice::from_ref(&family), &mut buf) {
                Ok(()) => out.extend_from_slice(&buf),
                Err(source) => {
                    let err = ExportError::Encode {
                        name: family.get_name().to_string(),
                        source,
                    };
                    tracing::warn!(error = %err, "skipping metric family");
                }
            }
        }

        out
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

impl Default for PrometheusExporter {
    fn default() -> Self {
        Self::new()
    }
}
