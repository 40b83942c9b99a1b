//! edge-stats Library
//!
//! Per-backend request statistics and Prometheus exposition for a
//! load-balancing proxy.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod pipeline;

// Re-export commonly used types
pub use adapters::inbound::MetricsServer;
pub use adapters::outbound::{ConnStatsCollector, HdrLatencyRecorder, PrometheusExporter};
pub use application::{RequestReport, StatsReporter};
pub use config::load_config;
pub use domain::entities::{ConnStats, StatsRegistry};
pub use domain::ports::{LatencyRecorder, SnapshotProvider};
pub use domain::value_objects::{bucket_from_path, FailureCounts};
pub use error::ExportError;
pub use pipeline::StatsPipeline;
