//! Stats Pipeline
//!
//! Wires registry, latency recorder and exporter from a [`Config`]. The
//! proxy core drives `reporter`; the scrape server renders `exporter`.

use crate::adapters::outbound::{ConnStatsCollector, HdrLatencyRecorder, PrometheusExporter};
use crate::application::StatsReporter;
use crate::config::Config;
use crate::domain::entities::StatsRegistry;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

pub struct StatsPipeline {
    pub registry: Arc<StatsRegistry>,
    pub reporter: Arc<StatsReporter>,
    pub exporter: Arc<PrometheusExporter>,
}

impl StatsPipeline {
    /// Build the pipeline; a bad decay setting or a registration clash is
    /// returned as an error.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let registry = Arc::new(StatsRegistry::new(cfg.endpoints.iter().cloned()));

        let latency = Arc::new(HdrLatencyRecorder::with_decay(
            &cfg.namespace,
            Duration::from_secs(cfg.summary_max_age_secs),
            cfg.summary_age_buckets,
        )?);

        let exporter = Arc::new(PrometheusExporter::new());
        exporter.register(Arc::new(ConnStatsCollector::new(
            registry.clone(),
            &cfg.namespace,
        )))?;
        exporter.register(latency.clone())?;

        let reporter = Arc::new(StatsReporter::new(registry.clone(), latency));

        Ok(Self {
            registry,
            reporter,
            exporter,
        })
    }
}
