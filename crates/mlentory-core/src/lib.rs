//! MLentory ingestion engine core: pipeline runtime, entity model, IRI minting,
//! identification, enrichment, normalization, RDF triple building, and the
//! temporal metadata graph algorithm.
//!
//! Connector crates (`mlentory-huggingface`, `mlentory-openml`, `mlentory-ai4life`,
//! `mlentory-arxiv`, `mlentory-wikipedia`, `mlentory-neo4j`, `mlentory-elasticsearch`)
//! depend on this crate for the shared model, error type, and stage/tool contracts.

pub mod config;
pub mod enrich;
pub mod error;
pub mod extractor;
pub mod identify;
pub mod iri;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod rdf;
pub mod run;
pub mod temporal;
pub mod tool;

pub use error::{Error, Result};
pub use extractor::{PrimaryFetch, SourceExtractor};
pub use model::{CreativeWork, Dataset, DefinedTerm, ExtractionMetadata, Language, MlModel, ScholarlyArticle};
pub use pipeline::{Stage, StageGraph, StageInputs, StageOutput, StageResult};
pub use run::{RunId, RunPaths, StageTier};
pub use tool::Tool;
