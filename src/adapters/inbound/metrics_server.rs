//! Metrics Scrape Server
//!
//! HTTP endpoint that renders the exporter's snapshot on every scrape.

use crate::adapters::outbound::PrometheusExporter;
use crate::error::{ExportError, Result};
use crate::infrastructure::ShutdownController;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{IntCounterVec, IntGauge, Opts};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared state of the scrape handler.
///
/// Besides the exporter it carries the scrape self-instrumentation, which
/// lives in the exporter's own registry and so shows up in every scrape.
#[derive(Clone)]
pub struct MetricsState {
    pub exporter: Arc<PrometheusExporter>,
    scrapes: IntCounterVec,
    in_flight: IntGauge,
}

impl MetricsState {
    pub fn new(exporter: Arc<PrometheusExporter>) -> Result<Self> {
        let scrapes = IntCounterVec::new(
            Opts::new(
                "promhttp_metric_handler_requests_total",
                "Total number of scrapes by HTTP status code.",
            ),
            &["code"],
        )
        .map_err(|source| ExportError::Descriptor {
            name: "promhttp_metric_handler_requests_total".to_string(),
            source,
        })?;
        let in_flight = IntGauge::new(
            "promhttp_metric_handler_requests_in_flight",
            "Current number of scrapes being served.",
        )
        .map_err(|source| ExportError::Descriptor {
            name: "promhttp_metric_handler_requests_in_flight".to_string(),
            source,
        })?;

        exporter
            .registry()
            .register(Box::new(scrapes.clone()))
            .map_err(ExportError::Registration)?;
        exporter
            .registry()
            .register(Box::new(in_flight.clone()))
            .map_err(ExportError::Registration)?;

        Ok(Self {
            exporter,
            scrapes,
            in_flight,
        })
    }

    /// Number of scrapes served with the given status code.
    pub fn scrape_count(&self, code: &str) -> u64 {
        self.scrapes.with_label_values(&[code]).get()
    }
}

/// Scrape server exposing `GET /metrics`.
pub struct MetricsServer {
    listen_addr: String,
    state: MetricsState,
}

impl MetricsServer {
    pub fn new(listen_addr: String, exporter: Arc<PrometheusExporter>) -> Result<Self> {
        Ok(Self {
            listen_addr,
            state: MetricsState::new(exporter)?,
        })
    }

    pub fn state(&self) -> MetricsState {
        self.state.clone()
    }

    /// Router serving the scrape endpoint.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the scrape server until shutdown is signalled.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let app = self.router().layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("metrics endpoint listening on {}/metrics", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("metrics endpoint stopped");
        Ok(())
    }
}

/// Build the scrape router over existing state.
pub fn router(state: MetricsState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Counts one scrape in flight until dropped.
struct InFlightGuard {
    gauge: IntGauge,
}

impl InFlightGuard {
    fn new(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self {
            gauge: gauge.clone(),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    let body = {
        let _in_flight = InFlightGuard::new(&state.in_flight);
        state.exporter.encode_text()
    };
    state.scrapes.with_label_values(&["200"]).inc();

    tracing::debug!(bytes = body.len(), "served scrape");
    ([(header::CONTENT_TYPE, state.exporter.content_type())], body)
}
