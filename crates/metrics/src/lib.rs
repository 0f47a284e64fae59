//! Metrics for tollgate.
//!
//! All crates record through the `metrics` facade re-exported here. Nothing is
//! collected unless a recorder is installed; with the `prometheus` feature,
//! [`init_metrics`] installs one and [`MetricsHandle::render`] returns the
//! Prometheus text exposition.
//!
//! ```rust,ignore
//! use tollgate_metrics::{counter, mcp};
//!
//! counter!(mcp::TOOL_CALLS_TOTAL, "tool" => "list_tables").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
