//! The source-extractor contract shared by every platform crate (§4.2, §4.2a).
//!
//! `mlentory-huggingface`, `mlentory-openml`, and `mlentory-ai4life` each
//! implement [`SourceExtractor`] for their own primary-record shape; the
//! pipeline's stage wiring is identical across platforms because it only ever
//! talks to this trait plus the entity-kind clients in [`crate::enrich`].

use crate::identify::RawRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The result of `FetchPrimary` (§4.2): the platform's primary record set,
/// already reduced to the platform-agnostic [`RawRecord`] shape plus whatever
/// original payload the normalizer still needs, alongside the timestamp the
/// fetch completed at.
#[derive(Debug, Clone)]
pub struct PrimaryFetch {
    pub records: Vec<RawRecord>,
    pub raw_payloads: Vec<serde_json::Value>,
    pub fetched_at: DateTime<Utc>,
}

/// A platform's primary-record extractor (§4.2, §4.2a).
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    /// Stable platform name (`"huggingface"`, `"openml"`, `"ai4life"`), used in
    /// run-folder paths and IRI minting.
    fn platform(&self) -> &str;

    /// `FetchPrimary(config)`: honors `num_records`/`offset`/`update_recent`,
    /// filters records below the platform's information threshold, and
    /// deduplicates by primary id.
    async fn fetch_primary(&self) -> crate::error::Result<PrimaryFetch>;
}

/// Deduplicate a primary fetch by [`RawRecord::id`], keeping the first
/// occurrence (§4.2 "deduplicate by primary id").
pub fn dedupe_by_id(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut seen = std::collections::HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}
