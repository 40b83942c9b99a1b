mod metrics_server;

pub use metrics_server::{router, MetricsServer, MetricsState};
