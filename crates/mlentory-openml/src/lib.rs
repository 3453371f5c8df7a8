//! OpenML source extractor (§4.2a): experiment-tracking registry, field-based
//! entity references (`dataset_id`, `flow_id`) rather than prefixed tags.

use async_trait::async_trait;
use chrono::Utc;
use mlentory_core::extractor::{dedupe_by_id, PrimaryFetch, SourceExtractor};
use mlentory_core::identify::RawRecord;
use mlentory_core::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

const DEFAULT_BASE_URL: &str = "https://www.openml.org/api/v1/json";

/// Configuration for one `FetchPrimary` call (§6.4 `platforms.openml`).
#[derive(Debug, Clone)]
pub struct OpenMlConfig {
    pub base_url: String,
    pub num_instances: usize,
    pub offset: usize,
}

impl Default for OpenMlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            num_instances: 100,
            offset: 0,
        }
    }
}

/// One OpenML run, the registry's primary record kind.
#[derive(Debug, Deserialize)]
struct OpenMlRun {
    run_id: String,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    flow_id: Option<String>,
    #[serde(default)]
    dataset_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
}

struct OpenMlListing {
    runs: Vec<OpenMlRun>,
}

/// The OpenML registry extractor.
pub struct OpenMlExtractor {
    http: reqwest::Client,
    config: OpenMlConfig,
}

impl OpenMlExtractor {
    #[must_use]
    pub fn new(config: OpenMlConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch_listing(&self) -> Result<OpenMlListing> {
        let url = format!(
            "{}/run/list/limit/{}/offset/{}",
            self.config.base_url, self.config.num_instances, self.config.offset
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transient("openml", e))?;
        if !response.status().is_success() {
            return Err(Error::transient(
                "openml",
                format!("listing request returned {}", response.status()),
            ));
        }
        let runs = response
            .json::<Vec<OpenMlRun>>()
            .await
            .map_err(|e| Error::transient("openml", e))?;
        Ok(OpenMlListing { runs })
    }
}

/// A run with no dataset, flow, or description carries no usable signal and is
/// dropped by the information threshold.
fn passes_information_threshold(run: &OpenMlRun) -> bool {
    run.dataset_id.is_some() || run.flow_id.is_some() || run.description.as_deref().is_some_and(|d| !d.is_empty())
}

fn to_raw_record(run: OpenMlRun) -> RawRecord {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(dataset_id) = run.dataset_id {
        fields.insert("dataset".to_string(), vec![dataset_id]);
    }
    // OpenML's flow is the trained artifact a run builds on; it fills the same
    // "base model" reference slot the tag-based platforms use (§4.2a).
    if let Some(flow_id) = run.flow_id {
        fields.insert("base_model".to_string(), vec![flow_id]);
    }
    if let Some(task_id) = &run.task_id {
        fields.insert("task".to_string(), vec![task_id.clone()]);
    }
    RawRecord {
        id: run.run_id,
        tags: Vec::new(),
        card_text: run.description.unwrap_or_default(),
        pipeline_tag: None,
        library_name: run.uploader,
        fields,
    }
}

#[async_trait]
impl SourceExtractor for OpenMlExtractor {
    fn platform(&self) -> &str {
        "openml"
    }

    async fn fetch_primary(&self) -> Result<PrimaryFetch> {
        let listing = self.fetch_listing().await?;
        let mut records = Vec::with_capacity(listing.runs.len());
        let mut raw_payloads = Vec::with_capacity(listing.runs.len());
        for run in listing.runs {
            if !passes_information_threshold(&run) {
                continue;
            }
            raw_payloads.push(serde_json::json!({
                "run_id": run.run_id,
                "task_id": run.task_id,
            }));
            records.push(to_raw_record(run));
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

    fn run(run_id: &str, dataset_id: Option<&str>, flow_id: Option<&str>) -> OpenMlRun {
        OpenMlRun {
            run_id: run_id.to_string(),
            task_id: None,
            flow_id: flow_id.map(str::to_string),
            dataset_id: dataset_id.map(str::to_string),
            description: None,
            uploader: None,
        }
    }

    #[test]
    fn run_with_no_signal_fails_threshold() {
        assert!(!passes_information_threshold(&run("r1", None, None)));
    }

    #[test]
    fn run_with_dataset_passes_threshold() {
        assert!(passes_information_threshold(&run("r1", Some("d1"), None)));
    }

    #[test]
    fn field_based_reference_lands_under_reserved_prefix_keys() {
        let record = to_raw_record(run("r1", Some("d1"), Some("f1")));
        assert_eq!(record.fields.get("dataset"), Some(&vec!["d1".to_string()]));
        assert_eq!(record.fields.get("base_model"), Some(&vec!["f1".to_string()]));
    }

    #[tokio::test]
    async fn fetch_primary_filters_and_dedupes() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path_regex(r"^/run/list/.*"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"run_id": "r1", "dataset_id": "d1"},
                {"run_id": "r2"},
                {"run_id": "r1", "dataset_id": "d1"},
            ])))
            .mount(&server)
            .await;
        let extractor = OpenMlExtractor::new(OpenMlConfig {
            base_url: server.uri(),
            num_instances: 10,
            offset: 0,
        });
        let fetch = extractor.fetch_primary().await.unwrap();
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].id, "r1");
    }
}
