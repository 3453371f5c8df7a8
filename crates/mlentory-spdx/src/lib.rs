//! License enrichment client (§4.4): the SPDX license-list catalog fetched
//! once at startup, looked up by a curated HuggingFace-tag-to-SPDX-id alias
//! table before falling back to a direct id match.

use async_trait::async_trait;
use mlentory_core::enrich::{EnrichedRecord, EnrichmentClient};
use mlentory_core::model::CreativeWork;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_LIST_URL: &str =
    "https://raw.githubusercontent.com/spdx/license-list-data/main/json/licenses.json";

/// Configuration for the license enrichment client (§6.4 `enrichment.license`).
#[derive(Debug, Clone)]
pub struct SpdxClientConfig {
    pub list_url: String,
    pub concurrency: usize,
}

impl Default for SpdxClientConfig {
    fn default() -> Self {
        Self {
            list_url: DEFAULT_LIST_URL.to_string(),
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SpdxListEntry {
    #[serde(rename = "licenseId")]
    license_id: String,
    name: String,
    #[serde(rename = "reference")]
    reference: Option<String>,
    #[serde(rename = "seeAlso", default)]
    see_also: Vec<String>,
    #[serde(rename = "isDeprecatedLicenseId", default)]
    deprecated: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SpdxListResponse {
    #[serde(rename = "licenseListVersion")]
    license_list_version: Option<String>,
    #[serde(default)]
    licenses: Vec<SpdxListEntry>,
}

/// Maps common Hugging Face `license:` tags to their canonical SPDX id.
/// Hugging Face accepts free-form tags; this bridges the handful that
/// diverge from SPDX's own identifier spelling.
fn curated_aliases() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("apache-2.0", "Apache-2.0"),
        ("mit", "MIT"),
        ("bsd-3-clause", "BSD-3-Clause"),
        ("bsd-2-clause", "BSD-2-Clause"),
        ("cc-by-4.0", "CC-BY-4.0"),
        ("cc-by-sa-4.0", "CC-BY-SA-4.0"),
        ("cc-by-nc-4.0", "CC-BY-NC-4.0"),
        ("gpl-3.0", "GPL-3.0-only"),
        ("gpl-2.0", "GPL-2.0-only"),
        ("lgpl-3.0", "LGPL-3.0-only"),
        ("mpl-2.0", "MPL-2.0"),
        ("agpl-3.0", "AGPL-3.0-only"),
        ("unlicense", "Unlicense"),
        ("wtfpl", "WTFPL"),
        ("openrail", "OpenRAIL"),
        ("bigscience-bloom-rail-1.0", "BigScience-BLOOM-RAIL-1.0"),
    ])
}

/// The license enrichment client, backed by an in-memory SPDX catalog.
pub struct SpdxClient {
    catalog: HashMap<String, SpdxListEntry>,
    aliases: HashMap<&'static str, &'static str>,
    concurrency: usize,
}

impl SpdxClient {
    /// Fetches the full SPDX license list once and builds a lowercase-keyed
    /// catalog. A network or parse failure is a startup configuration error,
    /// not a per-lookup stub.
    pub async fn load(config: SpdxClientConfig) -> Result<Self, String> {
        let response = reqwest::get(&config.list_url).await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("spdx license list request returned {}", response.status()));
        }
        let body: SpdxListResponse = response.json().await.map_err(|e| e.to_string())?;
        tracing::debug!(
            version = body.license_list_version.as_deref().unwrap_or("unknown"),
            count = body.licenses.len(),
            "loaded spdx license list"
        );
        Ok(Self::with_catalog(body.licenses, config.concurrency))
    }

    #[must_use]
    pub fn with_catalog(entries: Vec<SpdxListEntry>, concurrency: usize) -> Self {
        let catalog = entries
            .into_iter()
            .map(|entry| (entry.license_id.to_lowercase(), entry))
            .collect();
        Self {
            catalog,
            aliases: curated_aliases(),
            concurrency: concurrency.max(1),
        }
    }

    fn resolve_id(&self, requested: &str) -> String {
        self.aliases
            .get(requested.to_lowercase().as_str())
            .map(|id| (*id).to_string())
            .unwrap_or_else(|| requested.to_string())
    }

    fn lookup(&self, requested: &str) -> Option<(CreativeWork, bool)> {
        let resolved = self.resolve_id(requested);
        let entry = self.catalog.get(&resolved.to_lowercase())?;
        let license = CreativeWork {
            identifier: vec![requested.to_string()],
            name: Some(entry.name.clone()),
            url: entry.reference.clone(),
            same_as: entry.see_also.clone(),
            alternate_name: vec![entry.license_id.clone()],
            description: None,
            abstract_: None,
            text: None,
            version: None,
            copyright_notice: None,
            legislation_jurisdiction: None,
            date_created: None,
            extraction_metadata: HashMap::new(),
        };
        Some((license, entry.deprecated))
    }
}

#[async_trait]
impl EnrichmentClient<EnrichedRecord<CreativeWork>> for SpdxClient {
    fn concurrency(&self) -> usize {
        self.concurrency
    }

    async fn fetch_specific(&self, ids: &[String]) -> Vec<EnrichedRecord<CreativeWork>> {
        mlentory_core::enrich::fetch_with_stubbing(ids, self.concurrency(), |id| async move {
            match self.lookup(&id) {
                Some((license, deprecated)) => {
                    let confidence = if deprecated { 0.5 } else { 0.95 };
                    Ok(EnrichedRecord::found(id, license, confidence))
                }
                None => Ok(EnrichedRecord::stub(&id, "not in the spdx license list")),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<SpdxListEntry> {
        vec![
            SpdxListEntry {
                license_id: "Apache-2.0".to_string(),
                name: "Apache License 2.0".to_string(),
                reference: Some("https://spdx.org/licenses/Apache-2.0.html".to_string()),
                see_also: vec!["https://www.apache.org/licenses/LICENSE-2.0".to_string()],
                deprecated: false,
            },
            SpdxListEntry {
                license_id: "GPL-1.0".to_string(),
                name: "GNU General Public License v1.0 only".to_string(),
                reference: None,
                see_also: Vec::new(),
                deprecated: true,
            },
        ]
    }

    #[test]
    fn curated_alias_resolves_huggingface_tag_to_spdx_id() {
        let client = SpdxClient::with_catalog(catalog(), 4);
        assert_eq!(client.resolve_id("apache-2.0"), "Apache-2.0");
    }

    #[test]
    fn unaliased_id_passes_through_unchanged() {
        let client = SpdxClient::with_catalog(catalog(), 4);
        assert_eq!(client.resolve_id("GPL-1.0"), "GPL-1.0");
    }

    #[tokio::test]
    async fn fetch_specific_resolves_a_known_alias() {
        let client = SpdxClient::with_catalog(catalog(), 4);
        let out = client.fetch_specific(&["apache-2.0".to_string()]).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].enriched);
        assert_eq!(
            out[0].data.as_ref().unwrap().name.as_deref(),
            Some("Apache License 2.0")
        );
    }

    #[tokio::test]
    async fn fetch_specific_stubs_an_unknown_license() {
        let client = SpdxClient::with_catalog(catalog(), 4);
        let out = client.fetch_specific(&["made-up-license".to_string()]).await;
        assert_eq!(out.len(), 1);
        assert!(!out[0].enriched);
    }
}
