//! Elasticsearch-backed document indexer (§4.8) and faceted search service
//! (§4.9) for the MLentory ingestion engine.

pub mod indexer;
pub mod query;
pub mod search;

pub use indexer::{build_document, DocumentIndexer, TranslationMap};
pub use query::{clamp_page_size, compile, DateRange, FacetRequest, SearchQuery};
pub use search::{FacetBucket, SearchClient, SearchResults};
