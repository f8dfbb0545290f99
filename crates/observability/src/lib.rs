//! Observability for the gamma exposure engine
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics for analytics cycles
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("gexctl", LogFormat::Pretty)?;
//!
//! // Optional
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_filter, LogFormat};
pub use metrics::{init_metrics, CycleMetrics, CycleOutcome, CycleTimer};
