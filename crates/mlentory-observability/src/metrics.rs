//! Prometheus-compatible metrics for the ingestion pipeline: counts of
//! records stubbed out of each connector, triples written to the graph
//! store, and documents indexed into the search engine.

use crate::error::{Error, Result};
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Arc, OnceLock};

/// The process-wide metrics registry. Connectors and store crates reach it
/// through [`MetricsRegistry::global`] rather than threading a handle
/// through every call site.
pub struct MetricsRegistry {
    registry: Registry,
    /// `records_stubbed_total{platform}` — records produced by an extractor
    /// before enrichment.
    pub records_stubbed: IntCounterVec,
    /// `triples_written_total{store}` — RDF triples persisted to the graph
    /// store.
    pub triples_written: IntCounterVec,
    /// `documents_indexed_total{platform}` — documents written to the
    /// search index.
    pub documents_indexed: IntCounterVec,
}

impl MetricsRegistry {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let records_stubbed = IntCounterVec::new(
            Opts::new("records_stubbed_total", "Records produced by an extractor before enrichment"),
            &["platform"],
        )
        .map_err(|e| Error::Metrics(e.to_string()))?;
        let triples_written = IntCounterVec::new(
            Opts::new("triples_written_total", "RDF triples persisted to the graph store"),
            &["store"],
        )
        .map_err(|e| Error::Metrics(e.to_string()))?;
        let documents_indexed = IntCounterVec::new(
            Opts::new("documents_indexed_total", "Documents written to the search index"),
            &["platform"],
        )
        .map_err(|e| Error::Metrics(e.to_string()))?;

        registry.register(Box::new(records_stubbed.clone())).map_err(|e| Error::Metrics(e.to_string()))?;
        registry.register(Box::new(triples_written.clone())).map_err(|e| Error::Metrics(e.to_string()))?;
        registry.register(Box::new(documents_indexed.clone())).map_err(|e| Error::Metrics(e.to_string()))?;

        Ok(Self { registry, records_stubbed, triples_written, documents_indexed })
    }

    /// The process-wide registry, lazily built on first access.
    #[must_use]
    pub fn global() -> Arc<Self> {
        static INSTANCE: OnceLock<Arc<MetricsRegistry>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(Self::new().expect("default metric registration cannot fail")))
            .clone()
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer).map_err(|e| Error::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| Error::Metrics(e.to_string()))
    }
}

/// Initialize (and validate) the global recorder. Call once at process
/// start; subsequent calls are no-ops since [`MetricsRegistry::global`] is
/// idempotent.
pub fn init_default_recorder() -> Result<()> {
    let _ = MetricsRegistry::global();
    Ok(())
}

/// Render the global registry's metrics in Prometheus text format.
pub fn export_metrics() -> Result<String> {
    MetricsRegistry::global().export()
}

/// The global registry handle.
#[must_use]
pub fn metrics_registry() -> Arc<MetricsRegistry> {
    MetricsRegistry::global()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_registry_is_a_singleton() {
        let a = MetricsRegistry::global();
        let b = MetricsRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn counters_increment_and_appear_in_the_exported_text() {
        let registry = MetricsRegistry::global();
        registry.triples_written.with_label_values(&["neo4j"]).inc_by(7);
        let text = registry.export().unwrap();
        assert!(text.contains("triples_written_total"));
        assert!(text.contains("neo4j"));
    }
}
