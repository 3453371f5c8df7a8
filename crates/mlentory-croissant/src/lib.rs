//! Dataset enrichment client (§4.4): one request per dataset id against a
//! Croissant metadata endpoint (the MLCommons JSON-LD dataset description
//! format), no silent drops, extraction metadata carries method + confidence.

use async_trait::async_trait;
use mlentory_core::enrich::{EnrichedRecord, EnrichmentClient};
use mlentory_core::model::Dataset;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://huggingface.co/api/datasets";

/// Configuration for the dataset enrichment client (§6.4 `enrichment.dataset`).
#[derive(Debug, Clone)]
pub struct CroissantClientConfig {
    pub base_url: String,
    pub concurrency: usize,
}

impl Default for CroissantClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: 4,
        }
    }
}

/// A Croissant `creator` value: either a bare string or an object carrying a
/// `name` field (the format permits both).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CroissantCreator {
    Name(String),
    Named { name: String },
}

impl CroissantCreator {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Named { name } => name,
        }
    }
}

/// The subset of a Croissant JSON-LD document a [`Dataset`] record needs.
#[derive(Debug, Clone, Default, Deserialize)]
struct CroissantResponse {
    name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    license: Option<String>,
    creator: Option<CroissantCreator>,
    #[serde(rename = "dateCreated")]
    date_created: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(rename = "citeAs")]
    cite_as: Option<String>,
    #[serde(rename = "conformsTo")]
    conforms_to: Option<String>,
}

/// The dataset enrichment client.
pub struct CroissantClient {
    http: reqwest::Client,
    config: CroissantClientConfig,
}

impl CroissantClient {
    #[must_use]
    pub fn new(config: CroissantClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch_one(&self, id: &str) -> Result<Dataset, String> {
        let url = format!("{}/{id}/croissant", self.config.base_url);
        let response = self.http.get(&url).send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("croissant request for '{id}' returned {}", response.status()));
        }
        let body: CroissantResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(Dataset {
            identifier: vec![id.to_string()],
            name: body.name.or_else(|| Some(id.to_string())),
            url: body.url.or_else(|| Some(format!("https://huggingface.co/datasets/{id}"))),
            same_as: Vec::new(),
            description: body.description,
            license: body.license,
            conforms_to: body.conforms_to,
            cite_as: body.cite_as,
            keywords: body.keywords,
            creator: body.creator.map(CroissantCreator::into_name),
            date_created: body.date_created,
            extraction_metadata: HashMap::new(),
        })
    }
}

#[async_trait]
impl EnrichmentClient<EnrichedRecord<Dataset>> for CroissantClient {
    fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    async fn fetch_specific(&self, ids: &[String]) -> Vec<EnrichedRecord<Dataset>> {
        mlentory_core::enrich::fetch_with_stubbing(ids, self.concurrency(), |id| async move {
            tracing::debug!(id = %id, "fetching croissant metadata");
            self.fetch_one(&id).await.map(|dataset| EnrichedRecord::found(id.clone(), dataset, 0.85))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_specific_returns_one_record_per_requested_id() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/squad/croissant"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "SQuAD",
                "description": "Stanford Question Answering Dataset",
                "license": "cc-by-sa-4.0",
                "keywords": ["question-answering"],
            })))
            .mount(&server)
            .await;

        let client = CroissantClient::new(CroissantClientConfig {
            base_url: server.uri(),
            concurrency: 2,
        });
        let out = client.fetch_specific(&["squad".to_string()]).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].enriched);
        assert_eq!(out[0].data.as_ref().unwrap().name.as_deref(), Some("SQuAD"));
    }

    #[tokio::test]
    async fn missing_dataset_is_stubbed_not_dropped() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = CroissantClient::new(CroissantClientConfig {
            base_url: server.uri(),
            concurrency: 2,
        });
        let out = client.fetch_specific(&["does-not-exist".to_string()]).await;
        assert_eq!(out.len(), 1);
        assert!(!out[0].enriched);
        assert_eq!(out[0].id, "does-not-exist");
    }

    #[tokio::test]
    async fn every_requested_id_appears_exactly_once() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/a/croissant"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "A"})))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/b/croissant"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = CroissantClient::new(CroissantClientConfig {
            base_url: server.uri(),
            concurrency: 2,
        });
        let out = client.fetch_specific(&["a".to_string(), "b".to_string()]).await;
        let mut ids: Vec<_> = out.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
