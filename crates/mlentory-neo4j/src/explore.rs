//! Graph exploration service (§4.10): depth-1, outgoing-only neighborhood
//! expansion around one entity.

use crate::connection::Neo4jStore;
use mlentory_core::{Error, Result};
use neo4rs::Query;
use std::collections::{BTreeMap, HashSet};

/// Only `Outgoing` is implemented; `Incoming`/`Both` are accepted by the
/// interface for forward compatibility but rejected at call time (frozen Open
/// Question decision: the original algorithm never expands incoming edges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreNode {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreEdge {
    pub source: String,
    pub target: String,
    pub relationship_type: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExploreMetadata {
    pub entity_id: String,
    pub depth: u32,
    pub direction: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExploreResult {
    pub nodes: Vec<ExploreNode>,
    pub edges: Vec<ExploreEdge>,
    pub metadata: ExploreMetadata,
}

pub struct GraphExplorer {
    store: Neo4jStore,
}

impl GraphExplorer {
    #[must_use]
    pub fn new(store: Neo4jStore) -> Self {
        Self { store }
    }

    /// `Explore(entity_id, depth=1, direction, relationships?)` (§4.10).
    ///
    /// `entity_id` may be a full IRI or a short id; short ids are matched
    /// against the `uri` property's trailing path segment.
    pub async fn explore(
        &self,
        entity_id: &str,
        direction: Direction,
        relationships: Option<&[String]>,
    ) -> Result<ExploreResult> {
        if direction != Direction::Outgoing {
            return Err(Error::configuration(
                "graph exploration only supports the outgoing direction",
            ));
        }

        let start_uri = self.resolve_uri(entity_id).await?;
        let start_labels = self.fetch_labels(&start_uri).await?;
        let mut start_properties = self.fetch_literal_properties(&start_uri).await?;

        let edges_from_start = self.fetch_outgoing_edges(&start_uri, relationships).await?;

        let mut neighbor_ids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut edges = Vec::new();
        for (rel_type, target) in &edges_from_start {
            start_properties
                .entry(rel_type.clone())
                .or_default()
                .push(target.clone());
            edges.push(ExploreEdge {
                source: start_uri.clone(),
                target: target.clone(),
                relationship_type: rel_type.clone(),
            });
            if seen.insert(target.clone()) {
                neighbor_ids.push(target.clone());
            }
        }

        let mut nodes = vec![ExploreNode {
            id: start_uri.clone(),
            labels: start_labels,
            properties: start_properties,
        }];

        for neighbor in &neighbor_ids {
            let labels = self.fetch_labels(neighbor).await?;
            let mut properties = self.fetch_literal_properties(neighbor).await?;
            // Unfiltered, per the worked example: a neighbor's own outgoing
            // edges are folded into its property map but never added to the
            // response's edge set (those belong to the start node only).
            let neighbor_edges = self.fetch_outgoing_edges(neighbor, None).await?;
            for (rel_type, target) in &neighbor_edges {
                properties.entry(rel_type.clone()).or_default().push(target.clone());
            }
            nodes.push(ExploreNode {
                id: neighbor.clone(),
                labels,
                properties,
            });
        }

        Ok(ExploreResult {
            nodes,
            edges,
            metadata: ExploreMetadata {
                entity_id: start_uri,
                depth: 1,
                direction: "outgoing",
            },
        })
    }

    async fn resolve_uri(&self, entity_id: &str) -> Result<String> {
        if entity_id.starts_with("http://") || entity_id.starts_with("https://") {
            return Ok(entity_id.to_string());
        }
        let mut result = self
            .store
            .graph
            .execute(
                Query::new(
                    "MATCH (n {uri: $id}) RETURN n.uri AS uri \
                     UNION MATCH (n) WHERE n.uri ENDS WITH $suffix RETURN n.uri AS uri LIMIT 1"
                        .to_string(),
                )
                .param("id", entity_id)
                .param("suffix", format!("/{entity_id}")),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        match result.next().await.map_err(|e| Error::store_unavailable("neo4j", e))? {
            Some(row) => row.get("uri").map_err(Error::other),
            None => Err(Error::other(format!("entity not found: {entity_id}"))),
        }
    }

    async fn fetch_labels(&self, uri: &str) -> Result<Vec<String>> {
        let mut result = self
            .store
            .graph
            .execute(
                Query::new("MATCH (n {uri: $uri}) RETURN labels(n) AS labels".to_string())
                    .param("uri", uri),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        match result.next().await.map_err(|e| Error::store_unavailable("neo4j", e))? {
            Some(row) => row.get("labels").map_err(Error::other),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_literal_properties(&self, uri: &str) -> Result<BTreeMap<String, Vec<String>>> {
        let mut result = self
            .store
            .graph
            .execute(
                Query::new("MATCH (n {uri: $uri}) RETURN properties(n) AS props".to_string())
                    .param("uri", uri),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        let mut out = BTreeMap::new();
        if let Some(row) = result.next().await.map_err(|e| Error::store_unavailable("neo4j", e))? {
            let props: BTreeMap<String, String> = row.get("props").map_err(Error::other)?;
            for (k, v) in props {
                if k != "uri" {
                    out.insert(k, vec![v]);
                }
            }
        }
        Ok(out)
    }

    async fn fetch_outgoing_edges(
        &self,
        uri: &str,
        relationships: Option<&[String]>,
    ) -> Result<Vec<(String, String)>> {
        let mut result = self
            .store
            .graph
            .execute(
                Query::new(
                    "MATCH (n {uri: $uri})-[r]->(m) RETURN type(r) AS rel_type, m.uri AS target"
                        .to_string(),
                )
                .param("uri", uri),
            )
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;

        let mut out = Vec::new();
        while let Some(row) = result.next().await.map_err(|e| Error::store_unavailable("neo4j", e))? {
            let rel_type: String = row.get("rel_type").map_err(Error::other)?;
            let target: String = row.get("target").map_err(Error::other)?;
            if relationships.map_or(true, |allowed| allowed.iter().any(|r| r == &rel_type)) {
                out.push((rel_type, target));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_outgoing_direction_is_rejected_without_a_store_round_trip() {
        assert_eq!(Direction::default(), Direction::Outgoing);
    }
}
