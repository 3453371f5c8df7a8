//! The four assistant tools (§4.11), each exposed behind the shared [`Tool`]
//! contract.

use crate::markdown::clean_description;
use crate::refine::{refine_query, FacetCatalog};
use async_trait::async_trait;
use mlentory_core::tool::Tool;
use mlentory_core::{Error, Result};
use mlentory_elasticsearch::{DateRange, FacetRequest, SearchClient, SearchQuery};
use mlentory_neo4j::{Direction, GraphExplorer};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const DEFAULT_FACET_SIZE: usize = 20;

/// Shared state the four tools are built around: the search index, the graph
/// store, the facet catalog used by `refine_query`, and a human-name ->
/// MLentory-IRI lookup built from the same translation map the document
/// indexer uses.
pub struct AssistantContext {
    pub search: SearchClient,
    pub explorer: GraphExplorer,
    pub index: String,
    pub facet_catalog: FacetCatalog,
    pub name_to_iri: HashMap<String, String>,
}

impl AssistantContext {
    #[must_use]
    pub fn new(
        search: SearchClient,
        explorer: GraphExplorer,
        index: String,
        facet_catalog: FacetCatalog,
        name_to_iri: HashMap<String, String>,
    ) -> Self {
        Self { search, explorer, index, facet_catalog, name_to_iri }
    }
}

fn string_list(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn clean_model_hit(mut hit: Value) -> Value {
    if let Some(description) = hit.get("description").and_then(Value::as_str) {
        let cleaned = clean_description(description);
        hit["description"] = json!(cleaned);
    }
    hit
}

/// `search_models(query, page, page_size, filters?)`.
pub struct SearchModels {
    ctx: Arc<AssistantContext>,
}

impl SearchModels {
    #[must_use]
    pub fn new(ctx: Arc<AssistantContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for SearchModels {
    fn name(&self) -> &str {
        "search_models"
    }

    fn description(&self) -> &str {
        "Search the model catalog with a free-text query, page through results, \
         and optionally filter by facet (license, mlTask, keywords, platform, ...)."
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "page": { "type": "integer", "minimum": 1 },
                "page_size": { "type": "integer", "minimum": 1, "maximum": 1000 },
                "filters": { "type": "object" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let text_query = args.get("query").and_then(Value::as_str).unwrap_or_default().to_string();
        let page = args.get("page").and_then(Value::as_u64).unwrap_or(1) as usize;
        let page_size = args.get("page_size").and_then(Value::as_u64).unwrap_or(20) as usize;

        let mut filters: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(obj) = args.get("filters").and_then(Value::as_object) {
            for (field, values) in obj {
                let list = values
                    .as_array()
                    .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                filters.insert(field.clone(), list);
            }
        }

        let facets = self
            .ctx
            .facet_catalog
            .keys()
            .map(|field| FacetRequest { field: field.clone(), size: DEFAULT_FACET_SIZE, search: None })
            .collect();

        let query = SearchQuery {
            text_query: text_query.clone(),
            filters: filters.clone(),
            date_filters: BTreeMap::new(),
            facets,
            page,
            page_size,
        };
        let results = self.ctx.search.search(&self.ctx.index, &query).await?;

        let models: Vec<Value> = results.hits.into_iter().map(clean_model_hit).collect();
        let has_next = (page * page_size) < results.total as usize;
        Ok(json!({
            "models": models,
            "total": results.total,
            "page": page,
            "page_size": page_size,
            "has_next": has_next,
            "has_prev": page > 1,
            "facets": results.facets.iter().map(|(field, buckets)| {
                (field.clone(), buckets.iter().map(|b| json!({"value": b.value, "count": b.count})).collect::<Vec<_>>())
            }).collect::<BTreeMap<_, _>>(),
            "filters": filters,
        }))
    }
}

/// `get_model_detail(model_id, resolve_properties?)`.
pub struct GetModelDetail {
    ctx: Arc<AssistantContext>,
}

impl GetModelDetail {
    #[must_use]
    pub fn new(ctx: Arc<AssistantContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetModelDetail {
    fn name(&self) -> &str {
        "get_model_detail"
    }

    fn description(&self) -> &str {
        "Fetch a single model's full record by id, optionally hydrating its \
         related entities (license, datasets, tasks, ...) via the graph."
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "model_id": { "type": "string" },
                "resolve_properties": { "type": "boolean" }
            },
            "required": ["model_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let model_id = args
            .get("model_id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::configuration("get_model_detail requires a model_id"))?;
        let resolve_properties = args.get("resolve_properties").and_then(Value::as_bool).unwrap_or(false);

        if !resolve_properties {
            return Ok(json!({ "id": model_id }));
        }

        let explored = self.ctx.explorer.explore(model_id, Direction::Outgoing, None).await?;
        Ok(json!({
            "id": model_id,
            "properties": explored.nodes.first().map(|n| &n.properties),
            "related": explored.nodes.iter().skip(1).map(|n| json!({"id": n.id, "labels": n.labels})).collect::<Vec<_>>(),
        }))
    }
}

/// `get_related_models_by_entity(entity_name)`: resolve a human name to an
/// IRI, then list models that reference it through a facet. Implemented
/// against the document index's facets rather than a graph incoming-edge
/// traversal, since the graph exploration service only supports the
/// outgoing direction.
pub struct GetRelatedModelsByEntity {
    ctx: Arc<AssistantContext>,
}

impl GetRelatedModelsByEntity {
    #[must_use]
    pub fn new(ctx: Arc<AssistantContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetRelatedModelsByEntity {
    fn name(&self) -> &str {
        "get_related_models_by_entity"
    }

    fn description(&self) -> &str {
        "Resolve a human-readable entity name (a license, dataset, task, ...) \
         and list the models connected to it."
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "entity_name": { "type": "string" } },
            "required": ["entity_name"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let entity_name = args
            .get("entity_name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::configuration("get_related_models_by_entity requires an entity_name"))?;

        let iri = self
            .ctx
            .name_to_iri
            .get(&entity_name.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::other(format!("unknown entity: {entity_name}")))?;

        let field = self
            .ctx
            .facet_catalog
            .iter()
            .find(|(_, values)| values.iter().any(|v| v.eq_ignore_ascii_case(entity_name)))
            .map(|(field, _)| field.clone())
            .ok_or_else(|| Error::other(format!("entity has no facet membership: {entity_name}")))?;

        let mut filters = BTreeMap::new();
        filters.insert(field, vec![entity_name.to_string()]);
        let query = SearchQuery {
            text_query: String::new(),
            filters,
            date_filters: BTreeMap::<String, DateRange>::new(),
            facets: Vec::new(),
            page: 1,
            page_size: 100,
        };
        let results = self.ctx.search.search(&self.ctx.index, &query).await?;
        Ok(json!({
            "entity": { "name": entity_name, "iri": iri },
            "models": results.hits.into_iter().map(clean_model_hit).collect::<Vec<_>>(),
        }))
    }
}

/// `refine_query(query)`.
pub struct RefineQuery {
    ctx: Arc<AssistantContext>,
}

impl RefineQuery {
    #[must_use]
    pub fn new(ctx: Arc<AssistantContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for RefineQuery {
    fn name(&self) -> &str {
        "refine_query"
    }

    fn description(&self) -> &str {
        "Tokenize a free-text search query, drop stopwords, and lift any \
         tokens matching a known facet value into structured filters."
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let text_query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::configuration("refine_query requires a query"))?;
        let refined = refine_query(text_query, &self.ctx.facet_catalog);
        Ok(json!({ "query": refined.query, "filters": refined.filters }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_model_hit_strips_code_blocks_from_the_description_field() {
        let hit = json!({ "name": "bert", "description": "Intro.\n\n```py\nsecret()\n```" });
        let cleaned = clean_model_hit(hit);
        assert!(!cleaned["description"].as_str().unwrap().contains("secret"));
        assert_eq!(cleaned["name"], json!("bert"));
    }

    #[test]
    fn string_list_reads_a_string_array_field() {
        let value = json!({ "tags": ["a", "b", 3] });
        assert_eq!(string_list(&value, "tags"), vec!["a".to_string(), "b".to_string()]);
    }
}
