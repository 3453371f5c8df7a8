//! HuggingFace Hub source extractor (§4.2a): paginated model listing, tag
//! vocabulary in `prefix:value` form, README as card text.

use async_trait::async_trait;
use chrono::Utc;
use mlentory_core::extractor::{dedupe_by_id, PrimaryFetch, SourceExtractor};
use mlentory_core::identify::RawRecord;
use mlentory_core::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

const DEFAULT_BASE_URL: &str = "https://huggingface.co";
const MIN_CARD_LENGTH: usize = 200;

/// Configuration for one `FetchPrimary` call (§4.2, §6.4 `platforms.huggingface`).
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub base_url: String,
    pub num_models: usize,
    pub offset: usize,
    pub update_recent: bool,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            num_models: 100,
            offset: 0,
            update_recent: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HubModelListing {
    id: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    library_name: Option<String>,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    downloads: Option<u64>,
}

/// The Hub model-listing extractor.
pub struct HuggingFaceExtractor {
    http: reqwest::Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceExtractor {
    #[must_use]
    pub fn new(config: HuggingFaceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch_listing_page(&self) -> Result<Vec<HubModelListing>> {
        let sort = if self.config.update_recent { "lastModified" } else { "downloads" };
        let url = format!(
            "{}/api/models?limit={}&offset={}&sort={sort}&direction=-1&full=true",
            self.config.base_url, self.config.num_models, self.config.offset
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transient("huggingface", e))?;
        if !response.status().is_success() {
            return Err(Error::transient(
                "huggingface",
                format!("listing request returned {}", response.status()),
            ));
        }
        response
            .json::<Vec<HubModelListing>>()
            .await
            .map_err(|e| Error::transient("huggingface", e))
    }

    /// Fetch a model's README to use as card text; a missing README is not an
    /// error, just an empty card (the information-threshold filter then drops
    /// the record if nothing else qualifies it).
    async fn fetch_readme(&self, model_id: &str) -> String {
        let url = format!("{}/{model_id}/raw/main/README.md", self.config.base_url);
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        }
    }
}

fn passes_information_threshold(card: &str, pipeline_tag: &Option<String>) -> bool {
    card.len() >= MIN_CARD_LENGTH || pipeline_tag.is_some()
}

fn to_raw_record(listing: HubModelListing, card_text: String) -> RawRecord {
    let mut fields = BTreeMap::new();
    if let Some(author) = &listing.author {
        fields.insert("author".to_string(), vec![author.clone()]);
    }
    RawRecord {
        id: listing.id,
        tags: listing.tags,
        card_text,
        pipeline_tag: listing.pipeline_tag,
        library_name: listing.library_name,
        fields,
    }
}

#[async_trait]
impl SourceExtractor for HuggingFaceExtractor {
    fn platform(&self) -> &str {
        "huggingface"
    }

    async fn fetch_primary(&self) -> Result<PrimaryFetch> {
        let listings = self.fetch_listing_page().await?;
        let mut records = Vec::with_capacity(listings.len());
        let mut raw_payloads = Vec::with_capacity(listings.len());
        for listing in listings {
            let card_text = self.fetch_readme(&listing.id).await;
            if !passes_information_threshold(&card_text, &listing.pipeline_tag) {
                continue;
            }
            raw_payloads.push(serde_json::json!({
                "id": listing.id,
                "lastModified": listing.last_modified,
                "likes": listing.likes,
                "downloads": listing.downloads,
            }));
            records.push(to_raw_record(listing, card_text));
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

    #[test]
    fn short_card_without_pipeline_tag_is_filtered() {
        assert!(!passes_information_threshold("short", &None));
    }

    #[test]
    fn pipeline_tag_alone_satisfies_threshold() {
        assert!(passes_information_threshold("x", &Some("text-generation".to_string())));
    }

    #[test]
    fn long_card_satisfies_threshold_without_a_tag() {
        let card = "x".repeat(MIN_CARD_LENGTH);
        assert!(passes_information_threshold(&card, &None));
    }

    #[test]
    fn raw_record_carries_author_as_a_field() {
        let listing = HubModelListing {
            id: "a/b".to_string(),
            tags: vec!["dataset:d1".to_string()],
            pipeline_tag: Some("fill-mask".to_string()),
            library_name: Some("transformers".to_string()),
            last_modified: None,
            author: Some("org-a".to_string()),
            likes: None,
            downloads: None,
        };
        let record = to_raw_record(listing, "card".to_string());
        assert_eq!(record.fields.get("author"), Some(&vec!["org-a".to_string()]));
        assert_eq!(record.id, "a/b");
    }

    #[tokio::test]
    async fn fetch_primary_deduplicates_and_filters_by_threshold() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/models"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "a/b", "tags": [], "pipeline_tag": "text-generation"},
                {"id": "c/d", "tags": [], "pipeline_tag": null},
            ])))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/a/b/raw/main/README.md"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("readme"))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/c/d/raw/main/README.md"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = HuggingFaceExtractor::new(HuggingFaceConfig {
            base_url: server.uri(),
            num_models: 10,
            offset: 0,
            update_recent: false,
        });
        let fetch = extractor.fetch_primary().await.unwrap();
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].id, "a/b");
    }
}
