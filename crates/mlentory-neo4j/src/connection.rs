//! Shared Neo4j connection handle for the triple store, temporal store, and
//! graph exploration service.

use mlentory_core::{Error, Result};
use neo4rs::Graph;
use std::sync::Arc;

/// A Bolt connection to the store, cheap to clone (wraps an `Arc`).
#[derive(Clone)]
pub struct Neo4jStore {
    pub(crate) graph: Arc<Graph>,
}

impl Neo4jStore {
    /// Connect and verify reachability with a trivial round trip.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| Error::store_unavailable("neo4j", e))?;
        Ok(Self { graph: Arc::new(graph) })
    }

    #[must_use]
    pub fn from_graph(graph: Graph) -> Self {
        Self { graph: Arc::new(graph) }
    }
}
