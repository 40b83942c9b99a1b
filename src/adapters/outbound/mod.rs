mod conn_stats_collector;
mod hdr_latency_recorder;
mod prometheus_exporter;

pub use conn_stats_collector::ConnStatsCollector;
pub use hdr_latency_recorder::{
    HdrLatencyRecorder, DEFAULT_AGE_BUCKETS, DEFAULT_MAX_AGE, SUMMARY_QUANTILES,
};
pub use prometheus_exporter::{PrometheusExporter, ProviderCollector};
