//! Neo4j-backed [`TemporalStore`] (§4.7): snapshots live as
//! `(:Model {uri})-[:HAS_SNAPSHOT]->(:Snapshot)` nodes keyed by content hash.

use crate::connection::Neo4jStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mlentory_core::error::Result;
use mlentory_core::temporal::{Candidate, PropertySnapshot, TemporalStore};
use mlentory_core::Error;
use neo4rs::Query;

pub struct Neo4jTemporalStore {
    store: Neo4jStore,
}

impl Neo4jTemporalStore {
    #[must_use]
    pub fn new(store: Neo4jStore) -> Self {
        Self { store }
    }

    fn row_to_snapshot(row: &neo4rs::Row) -> Result<PropertySnapshot> {
        let valid_from: String = row.get("valid_from").map_err(Error::other)?;
        let valid_to: Option<String> = row.get("valid_to").map_err(Error::other)?;
        Ok(PropertySnapshot {
            hash: row.get("hash").map_err(Error::other)?,
            predicate: row.get("predicate").map_err(Error::other)?,
            value: row.get("value").map_err(Error::other)?,
            value_uri: row.get("value_uri").ok(),
            valid_from: valid_from.parse().unwrap_or_else(|_| Utc::now()),
            valid_to: valid_to.and_then(|s| s.parse().ok()),
        })
    }
}

#[async_trait]
impl TemporalStore for Neo4jTemporalStore {
    async fn open_snapshots(&self, model_uri: &str, predicate: &str) -> Result<Vec<PropertySnapshot>> {
        let mut result = self
            .store
            .graph
            .execute(
                Query::new(
                    "MATCH (:Model {uri: $uri})-[:HAS_SNAPSHOT]->(s:Snapshot {predicate: $predicate}) \
                     WHERE s.valid_to IS NULL RETURN s.hash AS hash, s.predicate AS predicate, \
                     s.value AS value, s.value_uri AS value_uri, s.valid_from AS valid_from, \
                     s.valid_to AS valid_to"
                        .to_string(),
                )
                .param("uri", model_uri)
                .param("predicate", predicate),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        let mut out = Vec::new();
        while let Some(row) = result.next().await.map_err(|e| Error::store_unavailable("neo4j", e))? {
            out.push(Self::row_to_snapshot(&row)?);
        }
        Ok(out)
    }

    async fn close_snapshot(&self, model_uri: &str, predicate: &str, hash: &str, valid_to: DateTime<Utc>) -> Result<()> {
        self.store
            .graph
            .run(
                Query::new(
                    "MATCH (:Model {uri: $uri})-[:HAS_SNAPSHOT]->(s:Snapshot {predicate: $predicate, hash: $hash}) \
                     SET s.valid_to = $valid_to"
                        .to_string(),
                )
                .param("uri", model_uri)
                .param("predicate", predicate)
                .param("hash", hash)
                .param("valid_to", valid_to.to_rfc3339()),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))
    }

    async fn create_snapshot(&self, model_uri: &str, candidate: &Candidate, valid_from: DateTime<Utc>) -> Result<()> {
        self.store
            .graph
            .run(
                Query::new(
                    "MERGE (m:Model {uri: $uri}) \
                     CREATE (s:Snapshot {hash: $hash, predicate: $predicate, value: $value, \
                     value_uri: $value_uri, valid_from: $valid_from, valid_to: null}) \
                     CREATE (m)-[:HAS_SNAPSHOT]->(s)"
                        .to_string(),
                )
                .param("uri", model_uri)
                .param("hash", candidate.hash.as_str())
                .param("predicate", candidate.predicate.as_str())
                .param("value", candidate.value.as_str())
                .param("value_uri", candidate.value_uri.clone().unwrap_or_default())
                .param("valid_from", valid_from.to_rfc3339()),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))
    }

    async fn all_snapshots(&self, model_uri: &str) -> Result<Vec<PropertySnapshot>> {
        let mut result = self
            .store
            .graph
            .execute(
                Query::new(
                    "MATCH (:Model {uri: $uri})-[:HAS_SNAPSHOT]->(s:Snapshot) \
                     RETURN s.hash AS hash, s.predicate AS predicate, s.value AS value, \
                     s.value_uri AS value_uri, s.valid_from AS valid_from, s.valid_to AS valid_to"
                        .to_string(),
                )
                .param("uri", model_uri),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        let mut out = Vec::new();
        while let Some(row) = result.next().await.map_err(|e| Error::store_unavailable("neo4j", e))? {
            out.push(Self::row_to_snapshot(&row)?);
        }
        Ok(out)
    }

    async fn known_predicates(&self, model_uri: &str) -> Result<Vec<String>> {
        let mut result = self
            .store
            .graph
            .execute(
                Query::new(
                    "MATCH (:Model {uri: $uri})-[:HAS_SNAPSHOT]->(s:Snapshot) \
                     RETURN DISTINCT s.predicate AS predicate"
                        .to_string(),
                )
                .param("uri", model_uri),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        let mut out = Vec::new();
        while let Some(row) = result.next().await.map_err(|e| Error::store_unavailable("neo4j", e))? {
            out.push(row.get("predicate").map_err(Error::other)?);
        }
        Ok(out)
    }
}
