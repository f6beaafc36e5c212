//! Gateway statistics.
//!
//! Tracks request counts, cache effectiveness, cost against a large-tier
//! baseline, latency, and hallucination detections.

/// Counter aggregation
pub mod collector;
/// Report formatting
pub mod reporter;

pub use collector::{MetricsAggregator, RequestOutcome};
pub use reporter::format_report;
