//! Executes a compiled [`crate::query::SearchQuery`] against Elasticsearch and
//! parses hits + aggregations into typed results (§4.9, §6.5).

use crate::query::{compile, SearchQuery};
use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch, SearchParts,
};
use mlentory_core::{Error, Result};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FacetBucket {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub hits: Vec<JsonValue>,
    pub total: u64,
    pub facets: BTreeMap<String, Vec<FacetBucket>>,
}

pub struct SearchClient {
    client: Elasticsearch,
}

impl SearchClient {
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

    pub async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResults> {
        let body = compile(query);
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| Error::store_unavailable("elasticsearch", e))?;

        if !response.status_code().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::store_unavailable("elasticsearch", format!("search failed: {text}")));
        }

        let payload: JsonValue = response
            .json()
            .await
            .map_err(|e| Error::store_unavailable("elasticsearch", e))?;
        Ok(parse_response(&payload))
    }
}

fn parse_response(payload: &JsonValue) -> SearchResults {
    let total = payload["hits"]["total"]["value"].as_u64().unwrap_or(0);
    let hits = payload["hits"]["hits"]
        .as_array()
        .map(|arr| arr.iter().map(|hit| hit["_source"].clone()).collect())
        .unwrap_or_default();

    let mut facets = BTreeMap::new();
    if let Some(aggs) = payload["aggregations"].as_object() {
        for (field, agg) in aggs {
            let buckets = agg["buckets"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|b| {
                            let value = b["key"].as_str().map(str::to_string)?;
                            let count = b["doc_count"].as_u64().unwrap_or(0);
                            Some(FacetBucket { value, count })
                        })
                        .collect()
                })
                .unwrap_or_default();
            facets.insert(field.clone(), buckets);
        }
    }
    SearchResults { hits, total, facets }
}
