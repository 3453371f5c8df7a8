//! Logging and metrics for the MLentory ingestion pipeline (§10).
//!
//! Scope is deliberately narrow: structured logging via `tracing` +
//! `tracing-subscriber`, and a handful of `prometheus`-compatible counters
//! (records stubbed, triples written, documents indexed). There is no
//! distributed-tracing exporter and no cost tracking here — this pipeline
//! has no LLM spend to account for and nothing downstream to export spans
//! to.
//!
//! # Example
//!
//! ```rust,no_run
//! use mlentory_observability::{LoggingConfig, init_tracing};
//!
//! init_tracing(LoggingConfig::new("mlentory-cli")).unwrap();
//! // All tracing::span!/event! calls are now written to stdout.
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod tracer;

#[cfg(feature = "metrics-server")]
pub mod metrics_server;

pub use config::{LogFormat, LoggingConfig};
pub use error::{Error, Result};
pub use exporter::init_tracing;
pub use metrics::{export_metrics, init_default_recorder, metrics_registry, MetricsRegistry};
pub use tracer::Traceable;
