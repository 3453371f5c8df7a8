//! Neo4j-backed storage for the MLentory ingestion engine: the RDF triple
//! store (§4.6), the temporal metadata graph (§4.7), and the graph
//! exploration service (§4.10) all share one Bolt connection.

mod connection;
mod explore;
mod temporal_store;
mod triples;

pub use connection::Neo4jStore;
pub use explore::{Direction, ExploreEdge, ExploreMetadata, ExploreNode, ExploreResult, GraphExplorer};
pub use temporal_store::Neo4jTemporalStore;
pub use triples::{Neo4jTripleStore, PersistStats};
