//! AI4Life bio-imaging catalog source extractor (§4.2a): manifest-based records,
//! a relaxed information threshold, and an optional scraping fallback for
//! usage statistics the catalog API omits.

use async_trait::async_trait;
use chrono::Utc;
use mlentory_core::extractor::{dedupe_by_id, PrimaryFetch, SourceExtractor};
use mlentory_core::identify::RawRecord;
use mlentory_core::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "https://bioimage.io/api";

/// Configuration for one `FetchPrimary` call (§6.4 `platforms.ai4life`).
///
/// Exactly one of `models_file_path` (a static catalog snapshot) or `base_url`
/// (a paginated live catalog) drives the fetch; `models_file_path` takes
/// precedence when both are set.
#[derive(Debug, Clone, Default)]
pub struct Ai4LifeConfig {
    pub models_file_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub parent_id: Option<String>,
    pub enable_scraping: bool,
}

/// One catalog entry: a short manifest rather than a long-form markdown card.
#[derive(Debug, Clone, Deserialize)]
struct CatalogManifest {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    modality: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    source_dataset: Option<String>,
    #[serde(default)]
    downloads: Option<u64>,
}

/// The AI4Life catalog extractor.
pub struct Ai4LifeExtractor {
    http: reqwest::Client,
    config: Ai4LifeConfig,
}

impl Ai4LifeExtractor {
    #[must_use]
    pub fn new(config: Ai4LifeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogManifest>> {
        if let Some(path) = &self.config.models_file_path {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| Error::transient("ai4life", e))?;
            return serde_yml::from_str(&text).map_err(|e| Error::transient("ai4life", e));
        }
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let mut url = format!("{base_url}/collection");
        if let Some(parent_id) = &self.config.parent_id {
            url.push_str(&format!("?parent_id={parent_id}"));
        }
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transient("ai4life", e))?;
        if !response.status().is_success() {
            return Err(Error::transient(
                "ai4life",
                format!("catalog request returned {}", response.status()),
            ));
        }
        response
            .json::<Vec<CatalogManifest>>()
            .await
            .map_err(|e| Error::transient("ai4life", e))
    }

    /// Scrapes a per-entry downloads page when the catalog omits usage stats.
    /// Non-fatal: a scrape failure just leaves `downloads` unset.
    async fn scrape_downloads(&self, base_url: &str, entry_id: &str) -> Option<u64> {
        let url = format!("{base_url}/{entry_id}/stats/downloads");
        let resp = self.http.get(&url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.text().await.ok()?.trim().parse().ok()
    }
}

/// Manifests carry no long-form card; a non-empty task or modality field is
/// the usable-signal threshold instead of card length.
fn passes_information_threshold(manifest: &CatalogManifest) -> bool {
    manifest.task.as_deref().is_some_and(|s| !s.is_empty())
        || manifest.modality.as_deref().is_some_and(|s| !s.is_empty())
}

fn to_raw_record(manifest: CatalogManifest) -> RawRecord {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(dataset) = &manifest.source_dataset {
        fields.insert("dataset".to_string(), vec![dataset.clone()]);
    }
    if let Some(license) = &manifest.license {
        fields.insert("license".to_string(), vec![license.clone()]);
    }
    if let Some(modality) = &manifest.modality {
        fields.insert("modality".to_string(), vec![modality.clone()]);
    }
    let card_text = manifest.description.unwrap_or_default();
    RawRecord {
        id: manifest.id,
        tags: Vec::new(),
        card_text,
        pipeline_tag: manifest.task,
        library_name: manifest.name,
        fields,
    }
}

#[async_trait]
impl SourceExtractor for Ai4LifeExtractor {
    fn platform(&self) -> &str {
        "ai4life"
    }

    async fn fetch_primary(&self) -> Result<PrimaryFetch> {
        let manifests = self.fetch_catalog().await?;
        let base_url = self
            .config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut records = Vec::with_capacity(manifests.len());
        let mut raw_payloads = Vec::with_capacity(manifests.len());
        for mut manifest in manifests {
            if !passes_information_threshold(&manifest) {
                continue;
            }
            if self.config.enable_scraping && manifest.downloads.is_none() {
                manifest.downloads = self.scrape_downloads(&base_url, &manifest.id).await;
            }
            raw_payloads.push(serde_json::json!({
                "id": manifest.id,
                "downloads": manifest.downloads,
            }));
            records.push(to_raw_record(manifest));
        }
        Ok(PrimaryFetch {
            records: dedupe_by_id(records),
            raw_payloads,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str, task: Option<&str>, modality: Option<&str>) -> CatalogManifest {
        CatalogManifest {
            id: id.to_string(),
            name: None,
            task: task.map(str::to_string),
            modality: modality.map(str::to_string),
            description: None,
            license: None,
            source_dataset: None,
            downloads: None,
        }
    }

    #[test]
    fn manifest_without_task_or_modality_fails_threshold() {
        assert!(!passes_information_threshold(&manifest("m1", None, None)));
    }

    #[test]
    fn manifest_with_modality_alone_passes_threshold() {
        assert!(passes_information_threshold(&manifest("m1", None, Some("fluorescence"))));
    }

    #[test]
    fn dataset_and_license_land_in_fields() {
        let mut m = manifest("m1", Some("segmentation"), None);
        m.source_dataset = Some("d1".to_string());
        m.license = Some("cc-by-4.0".to_string());
        let record = to_raw_record(m);
        assert_eq!(record.fields.get("dataset"), Some(&vec!["d1".to_string()]));
        assert_eq!(record.fields.get("license"), Some(&vec!["cc-by-4.0".to_string()]));
    }

    #[tokio::test]
    async fn fetch_primary_reads_a_local_catalog_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        tokio::fs::write(
            &path,
            "- id: m1\n  task: segmentation\n- id: m2\n",
        )
        .await
        .unwrap();
        let extractor = Ai4LifeExtractor::new(Ai4LifeConfig {
            models_file_path: Some(path),
            ..Default::default()
        });
        let fetch = extractor.fetch_primary().await.unwrap();
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].id, "m1");
    }

    #[tokio::test]
    async fn fetch_primary_reads_a_live_catalog_endpoint() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/collection"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "m1", "modality": "electron-microscopy"},
            ])))
            .mount(&server)
            .await;
        let extractor = Ai4LifeExtractor::new(Ai4LifeConfig {
            base_url: Some(server.uri()),
            ..Default::default()
        });
        let fetch = extractor.fetch_primary().await.unwrap();
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].id, "m1");
    }
}
