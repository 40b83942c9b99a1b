mod latency_recorder;
mod snapshot_provider;

pub use latency_recorder::LatencyRecorder;
pub use snapshot_provider::{
    MetricDescriptor, MetricKind, MetricSample, SampleValue, SnapshotProvider,
};
