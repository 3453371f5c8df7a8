//! Shared test fixtures for the MLentory ingestion engine's crates: sample
//! [`RawRecord`]/[`MlModel`] values, scratch data-root directories, and (under
//! `mock-server`) stub HTTP servers for the platform extractors.

pub mod fixtures;

#[cfg(feature = "mock-server")]
pub mod mock_hub;
