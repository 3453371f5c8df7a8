//! Keyword enrichment client (§4.4): a curated CSV lookup first, Wikipedia
//! fallback second, stubbed with `source="not_found"` on a final miss.

use async_trait::async_trait;
use mlentory_core::enrich::{EnrichedRecord, EnrichmentClient};
use mlentory_core::model::{DefinedTerm, ExtractionMetadata};
use std::collections::HashMap;
use std::path::Path;

const SUMMARY_TRUNCATE_CHARS: usize = 500;

/// One row of the curated keyword CSV (`keyword,definition,aliases`).
#[derive(Debug, Clone, serde::Deserialize)]
struct CuratedRow {
    keyword: String,
    definition: String,
    #[serde(default)]
    aliases: String,
}

/// The two-tier keyword client: curated map first, Wikipedia second.
pub struct KeywordClient {
    curated: HashMap<String, CuratedRow>,
    concurrency: usize,
}

impl KeywordClient {
    /// Loads the curated CSV into memory. A missing or malformed file is a
    /// configuration error at startup, not a per-lookup stub.
    pub fn load(csv_path: &Path, concurrency: usize) -> mlentory_core::Result<Self> {
        let mut reader = csv::Reader::from_path(csv_path)
            .map_err(|e| mlentory_core::Error::configuration(format!("reading keyword csv: {e}")))?;
        let mut curated = HashMap::new();
        for row in reader.deserialize::<CuratedRow>() {
            let row = row.map_err(|e| mlentory_core::Error::configuration(format!("parsing keyword csv: {e}")))?;
            curated.insert(row.keyword.to_lowercase(), row);
        }
        Ok(Self { curated, concurrency: concurrency.max(1) })
    }

    #[must_use]
    pub fn with_curated(curated: HashMap<String, CuratedRow>, concurrency: usize) -> Self {
        Self { curated, concurrency: concurrency.max(1) }
    }

    fn lookup_curated(&self, keyword: &str) -> Option<EnrichedRecord<DefinedTerm>> {
        let row = self.curated.get(&keyword.to_lowercase())?;
        let term = DefinedTerm {
            identifier: vec![keyword.to_string()],
            name: Some(row.keyword.clone()),
            url: None,
            same_as: Vec::new(),
            term_code: None,
            in_defined_term_set: None,
            description: Some(row.definition.clone()),
            alternate_name: row
                .aliases
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            extraction_metadata: HashMap::new(),
        };
        Some(EnrichedRecord::found(keyword, term, 1.0))
    }

    /// Blocking Wikipedia lookup, run via `spawn_blocking` since the
    /// `wikipedia` crate is synchronous.
    async fn lookup_wikipedia(keyword: String) -> Option<DefinedTerm> {
        tokio::task::spawn_blocking(move || {
            let wiki = wikipedia::Wikipedia::<wikipedia::http::default::Client>::default();
            let page = wiki.page_from_title(keyword.clone());
            let summary = page.get_summary().ok()?;
            let url = page.get_url().ok();
            let truncated: String = summary.chars().take(SUMMARY_TRUNCATE_CHARS).collect();
            Some(DefinedTerm {
                identifier: vec![keyword.clone()],
                name: Some(keyword),
                url,
                same_as: Vec::new(),
                term_code: None,
                in_defined_term_set: None,
                description: Some(truncated),
                alternate_name: Vec::new(),
                extraction_metadata: HashMap::new(),
            })
        })
        .await
        .ok()
        .flatten()
    }

    fn stub_not_found(keyword: &str) -> EnrichedRecord<DefinedTerm> {
        EnrichedRecord {
            id: keyword.to_string(),
            enriched: false,
            data: None,
            extraction_metadata: ExtractionMetadata {
                method: "not_found".to_string(),
                confidence: 0.0,
                source_field: None,
                notes: Some("no curated entry and no Wikipedia page".to_string()),
            },
        }
    }
}

#[async_trait]
impl EnrichmentClient<EnrichedRecord<DefinedTerm>> for KeywordClient {
    fn concurrency(&self) -> usize {
        self.concurrency
    }

    async fn fetch_specific(&self, ids: &[String]) -> Vec<EnrichedRecord<DefinedTerm>> {
        mlentory_core::enrich::fetch_with_stubbing(ids, self.concurrency(), |keyword| async move {
            if let Some(hit) = self.lookup_curated(&keyword) {
                return Ok(hit);
            }
            match Self::lookup_wikipedia(keyword.clone()).await {
                Some(term) => Ok(EnrichedRecord::found(keyword, term, 0.6)),
                None => Ok(Self::stub_not_found(&keyword)),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curated_map() -> HashMap<String, CuratedRow> {
        let mut map = HashMap::new();
        map.insert(
            "nlp".to_string(),
            CuratedRow {
                keyword: "nlp".to_string(),
                definition: "Natural language processing.".to_string(),
                aliases: "natural language processing".to_string(),
            },
        );
        map
    }

    #[test]
    fn curated_lookup_is_case_insensitive() {
        let client = KeywordClient::with_curated(curated_map(), 4);
        let hit = client.lookup_curated("NLP").unwrap();
        assert!(hit.enriched);
        assert_eq!(hit.data.unwrap().name.as_deref(), Some("nlp"));
    }

    #[test]
    fn curated_miss_returns_none() {
        let client = KeywordClient::with_curated(curated_map(), 4);
        assert!(client.lookup_curated("unknown-term").is_none());
    }

    #[tokio::test]
    async fn fetch_specific_returns_one_record_per_requested_keyword() {
        let client = KeywordClient::with_curated(curated_map(), 4);
        let out = client
            .fetch_specific(&["nlp".to_string()])
            .await;
        assert_eq!(out.len(), 1);
        assert!(out[0].enriched);
    }

    #[test]
    fn load_reads_a_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.csv");
        std::fs::write(&path, "keyword,definition,aliases\nnlp,Natural language processing.,\n").unwrap();
        let client = KeywordClient::load(&path, 4).unwrap();
        assert!(client.curated.contains_key("nlp"));
    }
}
