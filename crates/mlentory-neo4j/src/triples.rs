//! Neo4j-backed triple store (§4.6): persists an [`RdfGraph`]'s triples and,
//! after flushing, exports a Turtle file restricted to the subjects written in
//! the run.

use crate::connection::Neo4jStore;
use mlentory_core::enrich::EnrichedRecord;
use mlentory_core::rdf::{Object, RdfGraph, Triple};
use mlentory_core::{Error, Result};
use neo4rs::Query;
use std::path::Path;

/// Stats returned by a `PersistAndExport` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub records_written: usize,
    pub triples_written: usize,
}

/// Rewrites a predicate IRI (`fair4ml:trainedOn`, `rdf:type`, ...) into a
/// Cypher-safe relationship-type/property-key token.
fn cypher_token(predicate: &str) -> String {
    predicate
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub struct Neo4jTripleStore {
    store: Neo4jStore,
}

impl Neo4jTripleStore {
    #[must_use]
    pub fn new(store: Neo4jStore) -> Self {
        Self { store }
    }

    /// Overwrite `subject`'s outgoing edges and literal properties before
    /// writing `triples` (§4.6 idempotence invariant).
    pub async fn replace_subject(&self, subject: &str, triples: &[Triple]) -> Result<()> {
        self.store
            .graph
            .run(
                Query::new(
                    "MERGE (s:Entity {uri: $uri}) \
                     WITH s OPTIONAL MATCH (s)-[r]->() DELETE r \
                     WITH s SET s = {uri: $uri}"
                        .to_string(),
                )
                .param("uri", subject),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        for triple in triples {
            self.persist_triple(triple).await?;
        }
        Ok(())
    }

    async fn persist_triple(&self, triple: &Triple) -> Result<()> {
        let predicate = cypher_token(&triple.predicate);
        match &triple.object {
            Object::Iri(target) => {
                let cypher = format!(
                    "MERGE (s:Entity {{uri: $subject}}) \
                     MERGE (o:Entity {{uri: $object}}) \
                     MERGE (s)-[:{predicate}]->(o)"
                );
                self.store
                    .graph
                    .run(
                        Query::new(cypher)
                            .param("subject", triple.subject.as_str())
                            .param("object", target.as_str()),
                    )
                    .await
                    .map_err(|e| Error::store_unavailable("neo4j", e))?;
            }
            Object::Literal { value, .. } => {
                let cypher = format!("MERGE (s:Entity {{uri: $subject}}) SET s.{predicate} = $value");
                self.store
                    .graph
                    .run(
                        Query::new(cypher)
                            .param("subject", triple.subject.as_str())
                            .param("value", value.as_str()),
                    )
                    .await
                    .map_err(|e| Error::store_unavailable("neo4j", e))?;
            }
        }
        Ok(())
    }

    /// Stream `MlModel` records from `json_path` (newline-delimited JSON), emit
    /// their triples in batches of `batch_size`, then export a Turtle file
    /// restricted to the subjects written this run (§4.6 `PersistAndExport`).
    pub async fn persist_and_export(
        &self,
        json_path: &Path,
        ttl_path: &Path,
        batch_size: usize,
    ) -> Result<PersistStats> {
        let text = tokio::fs::read_to_string(json_path)
            .await
            .map_err(Error::Io)?;
        let mut stats = PersistStats::default();
        let mut export = RdfGraph::new();
        let mut written_subjects = Vec::new();

        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        for batch in lines.chunks(batch_size.max(1)) {
            for line in batch {
                let model: mlentory_core::model::MlModel = serde_json::from_str(line)?;
                let triples = mlentory_core::rdf::build_mlmodel_triples(&model);
                let subject = mlentory_core::rdf::choose_subject(
                    mlentory_core::iri::EntityKind::MlModel,
                    &model.identifier,
                );
                self.replace_subject(&subject, &triples).await?;
                export.replace_subject(&subject, triples.clone());
                written_subjects.push(subject);
                stats.triples_written += triples.len();
                stats.records_written += 1;
            }
        }

        tokio::fs::write(ttl_path, export.to_turtle(&written_subjects))
            .await
            .map_err(Error::Io)?;
        Ok(stats)
    }

    /// Like [`Self::persist_and_export`], but for the `2_normalized/<kind>.json`
    /// enrichment artifacts: one [`EnrichedRecord<T>`] per line rather than a
    /// bare `T`. Stub records (failed lookups, `data: None`) carry no usable
    /// identifiers and are skipped rather than persisted (§4.6 `BuildTriples`
    /// is only defined over resolved records). Missing `json_path` (a platform
    /// run that never identified any reference of this kind) is not an error —
    /// yields an empty, untouched `ttl_path` is still written so downstream
    /// tooling can rely on the file existing.
    pub async fn persist_enriched_entities<T, F>(
        &self,
        json_path: &Path,
        ttl_path: &Path,
        batch_size: usize,
        build_triples: F,
    ) -> Result<PersistStats>
    where
        T: for<'de> serde::Deserialize<'de>,
        F: Fn(&T) -> Vec<Triple>,
    {
        let text = match tokio::fs::read_to_string(json_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::Io(e)),
        };
        let mut stats = PersistStats::default();
        let mut export = RdfGraph::new();
        let mut written_subjects = Vec::new();

        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        for batch in lines.chunks(batch_size.max(1)) {
            for line in batch {
                let record: EnrichedRecord<T> = serde_json::from_str(line)?;
                let Some(entity) = record.data else {
                    continue;
                };
                let triples = build_triples(&entity);
                let Some(subject) = triples.first().map(|t| t.subject.clone()) else {
                    continue;
                };
                self.replace_subject(&subject, &triples).await?;
                export.replace_subject(&subject, triples.clone());
                written_subjects.push(subject);
                stats.triples_written += triples.len();
                stats.records_written += 1;
            }
        }

        tokio::fs::write(ttl_path, export.to_turtle(&written_subjects))
            .await
            .map_err(Error::Io)?;
        Ok(stats)
    }
}
