//! Push-based observability for the VFM engine
//!
//! Metrics live in a private registry attached to an engine. The report binary
//! renders them into the log at the end of a run.

pub mod metrics;

pub use metrics::EngineMetrics;
