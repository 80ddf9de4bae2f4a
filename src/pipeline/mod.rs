//! Aggregation pipeline
//!
//! [`AggregationPipeline`] owns one run; the individual post-probe steps
//! live under [`stages`].

pub mod orchestrator;
pub mod stages;

pub use orchestrator::{AggregationPipeline, RunStats, RunSummary};
