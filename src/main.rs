//! edge-stats - backend request statistics exporter
//!
//! This is the composition root that wires together all the components.

use edge_stats::adapters::inbound::MetricsServer;
use edge_stats::infrastructure::{shutdown_signal, ShutdownController};
use edge_stats::{load_config, StatsPipeline};
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting edge-stats listen={} endpoints={} namespace={}",
        cfg.listen_addr,
        cfg.endpoints.len(),
        cfg.namespace
    );

    // ===== COMPOSITION ROOT =====

    // 1. Registry, latency summaries and exporter; errors abort startup.
    // `pipeline.reporter` is the handle a proxy core embedding this crate
    // feeds; the standalone binary only serves scrapes.
    let pipeline = StatsPipeline::from_config(&cfg)?;

    // 2. Scrape endpoint
    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server = MetricsServer::new(cfg.listen_addr.clone(), pipeline.exporter)?;
    server.run(shutdown).await
}
