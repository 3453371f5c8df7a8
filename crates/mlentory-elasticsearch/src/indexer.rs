//! Document indexer (§4.8): per-platform model index, mapping, and document
//! builder.

use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, DeleteByQueryParts, Elasticsearch,
};
use mlentory_core::model::MlModel;
use mlentory_core::{Error, Result};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;

/// IRI -> best display name, produced by a normalization stage that scans
/// every normalized record in the run.
pub type TranslationMap = HashMap<String, String>;

pub struct DocumentIndexer {
    client: Elasticsearch,
}

impl DocumentIndexer {
    pub fn new(url: &str) -> Result<Self> {
        let parsed = url
            .parse()
            .map_err(|e| Error::configuration(format!("invalid Elasticsearch URL '{url}': {e}")))?;
        let conn_pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(conn_pool)
            .build()
            .map_err(|e| Error::configuration(format!("building Elasticsearch transport: {e}")))?;
        Ok(Self { client: Elasticsearch::new(transport) })
    }

    #[must_use]
    pub fn from_client(client: Elasticsearch) -> Self {
        Self { client }
    }

    /// `EnsureIndex(name)`: idempotent create, single-shard/zero-replica
    /// settings, keyword-typed facet fields plus text-typed name/description.
    pub async fn ensure_index(&self, name: &str) -> Result<()> {
        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| Error::store_unavailable("elasticsearch", e))?;
        if exists.status_code().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .body(Self::mapping())
            .send()
            .await
            .map_err(|e| Error::store_unavailable("elasticsearch", e))?;

        if !response.status_code().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::store_unavailable("elasticsearch", format!("create index failed: {body}")));
        }
        Ok(())
    }

    fn mapping() -> JsonValue {
        json!({
            "settings": { "number_of_shards": 1, "number_of_replicas": 0 },
            "mappings": {
                "properties": {
                    "identifier": { "type": "keyword" },
                    "author": { "type": "keyword" },
                    "sharedBy": { "type": "keyword" },
                    "license": { "type": "keyword" },
                    "mlTask": { "type": "keyword" },
                    "keywords": { "type": "keyword" },
                    "trainedOn": { "type": "keyword" },
                    "platform": { "type": "keyword" },
                    "name": { "type": "text" },
                    "description": { "type": "text" },
                    "dateCreated": { "type": "date", "ignore_malformed": true },
                    "dateModified": { "type": "date", "ignore_malformed": true },
                    "datePublished": { "type": "date", "ignore_malformed": true }
                }
            }
        })
    }

    /// `CleanIndex(name)`: remove all documents, keep the mapping.
    pub async fn clean_index(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[name]))
            .body(json!({ "query": { "match_all": {} } }))
            .send()
            .await
            .map_err(|e| Error::store_unavailable("elasticsearch", e))?;
        if !response.status_code().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::store_unavailable("elasticsearch", format!("clean index failed: {body}")));
        }
        Ok(())
    }

    /// `IndexModel(model, translation_map)`: build a document, translating
    /// IRI-valued facet fields back to human-readable labels, and persist it.
    pub async fn index_model(&self, index: &str, platform: &str, model: &MlModel, translation_map: &TranslationMap) -> Result<()> {
        let document = build_document(platform, model, translation_map);
        let id = model
            .mlentory_iri()
            .map(str::to_string)
            .or_else(|| model.name.clone())
            .unwrap_or_default();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(vec![
                json!({ "index": { "_id": id } }).into(),
                document.into(),
            ])
            .send()
            .await
            .map_err(|e| Error::store_unavailable("elasticsearch", e))?;

        if !response.status_code().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::store_unavailable("elasticsearch", format!("index model failed: {body}")));
        }
        Ok(())
    }
}

fn translate(translation_map: &TranslationMap, iri: &str) -> String {
    translation_map.get(iri).cloned().unwrap_or_else(|| iri.to_string())
}

fn translate_all(translation_map: &TranslationMap, iris: &[String]) -> Vec<String> {
    iris.iter().map(|iri| translate(translation_map, iri)).collect()
}

/// Build the indexable document for `model`, translating IRI-valued facet
/// fields via `translation_map`.
#[must_use]
pub fn build_document(platform: &str, model: &MlModel, translation_map: &TranslationMap) -> JsonValue {
    let license = model.license.as_deref().map(|iri| translate(translation_map, iri));
    json!({
        "identifier": model.identifier,
        "name": model.name,
        "description": model.description,
        "author": model.author,
        "sharedBy": model.shared_by,
        "license": license,
        "mlTask": translate_all(translation_map, &model.ml_task),
        "keywords": translate_all(translation_map, &model.keywords),
        "trainedOn": translate_all(translation_map, &model.trained_on),
        "platform": platform,
        "dateCreated": model.date_created,
        "dateModified": model.date_modified,
        "datePublished": model.date_published,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> MlModel {
        MlModel {
            identifier: vec!["https://w3id.org/mlentory/mlentory_graph/model/abc".to_string()],
            name: Some("bert-base".to_string()),
            description: Some("A transformer model.".to_string()),
            license: Some("https://w3id.org/mlentory/mlentory_graph/license/mit".to_string()),
            ml_task: vec!["https://w3id.org/mlentory/mlentory_graph/term/ner".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn build_document_translates_license_iri_to_label() {
        let mut translation_map = TranslationMap::new();
        translation_map.insert(
            "https://w3id.org/mlentory/mlentory_graph/license/mit".to_string(),
            "MIT".to_string(),
        );
        let doc = build_document("huggingface", &sample_model(), &translation_map);
        assert_eq!(doc["license"], json!("MIT"));
        assert_eq!(doc["platform"], json!("huggingface"));
    }

    #[test]
    fn build_document_falls_back_to_iri_when_untranslated() {
        let doc = build_document("huggingface", &sample_model(), &TranslationMap::new());
        assert_eq!(
            doc["mlTask"],
            json!(["https://w3id.org/mlentory/mlentory_graph/term/ner"])
        );
    }
}
