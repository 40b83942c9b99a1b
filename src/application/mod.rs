//! Application Layer
//!
//! Use cases exposed to the proxy core.

mod stats_reporter;

pub use stats_reporter::{RequestReport, StatsReporter};
