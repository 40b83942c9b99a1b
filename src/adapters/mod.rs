//! Adapters Layer
//!
//! Inbound: the scrape HTTP endpoint.
//! Outbound: the latency summaries and the Prometheus exposition.

pub mod inbound;
pub mod outbound;
