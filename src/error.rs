//! Exporter errors.

use thiserror::Error;

/// Errors raised while wiring or rendering the metrics exporter.
///
/// Registration and descriptor errors happen once at startup and are
/// meant to abort it. Encoding errors are per metric family; the renderer
/// logs and skips them.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid metric descriptor `{name}`: {source}")]
    Descriptor {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    #[error("failed to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("invalid summary decay: {0}")]
    Decay(String),

    #[error("collector registration failed: {0}")]
    Registration(#[source] prometheus::Error),

    #[error("failed to encode metric family `{name}`: {source}")]
    Encode {
        name: String,
        #[source]
        source: prometheus::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExportError>;
