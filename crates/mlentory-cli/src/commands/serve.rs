//! `mlentory serve`: the search/graph HTTP API (§6.5) - five read-only
//! endpoints over the Elasticsearch index and the Neo4j graph.

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Args;
use mlentory_core::config::StoreSecrets;
use mlentory_core::Error as CoreError;
use mlentory_elasticsearch::{clamp_page_size, DateRange, FacetRequest, SearchClient, SearchQuery};
use mlentory_neo4j::{Direction, GraphExplorer, Neo4jStore};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port the HTTP API listens on.
    #[arg(long, default_value_t = 8090)]
    pub port: u16,

    /// Elasticsearch index to search against.
    #[arg(long, default_value = "mlentory")]
    pub index: String,
}

#[derive(Clone)]
struct AppState {
    search: Arc<SearchClient>,
    explorer: Arc<GraphExplorer>,
    index: String,
}

/// Standard error body for every non-2xx response (mirrors the error-code
/// convention used elsewhere in the pack's registry APIs).
#[derive(Debug, Serialize)]
struct ApiError {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn store_error(err: CoreError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        CoreError::Configuration(_) => StatusCode::BAD_REQUEST,
        CoreError::StoreUnavailable { .. } | CoreError::Transient { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError::new("STORE_ERROR", err.to_string())))
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let secrets = StoreSecrets::from_env().context("resolving store credentials")?;

    let neo4j = Neo4jStore::connect(&secrets.neo4j_uri, &secrets.neo4j_user, &secrets.neo4j_password)
        .await
        .context("connecting to Neo4j")?;
    let explorer = GraphExplorer::new(neo4j);
    let search = SearchClient::new(&secrets.elasticsearch_host).context("building Elasticsearch client")?;

    let state = AppState {
        search: Arc::new(search),
        explorer: Arc::new(explorer),
        index: args.index,
    };

    let app = Router::new()
        .route("/models", get(list_models))
        .route("/models/:id", get(get_model))
        .route("/graph/:id", get(get_graph))
        .route("/stats/platform", get(platform_stats))
        .route("/health", get(health))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "mlentory search/graph API listening");
    axum::serve(listener, app).await.context("serving HTTP API")?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ListModelsParams {
    #[serde(default)]
    search: String,
    platform: Option<String>,
    license: Option<String>,
    task: Option<String>,
    #[serde(default)]
    facets: Option<String>,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    hits: Vec<JsonValue>,
    total: u64,
    page: usize,
    page_size: usize,
    facets: BTreeMap<String, Vec<JsonValue>>,
}

/// `GET /models?page&page_size&search&platform&license&task&facets` (§6.5).
async fn list_models(State(state): State<AppState>, Query(params): Query<ListModelsParams>) -> ApiResult<ModelsResponse> {
    let mut filters = BTreeMap::new();
    if let Some(platform) = params.platform {
        filters.insert("platform".to_string(), vec![platform]);
    }
    if let Some(license) = params.license {
        filters.insert("license".to_string(), vec![license]);
    }
    if let Some(task) = params.task {
        filters.insert("mlTask".to_string(), vec![task]);
    }

    let facets = params
        .facets
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|field| FacetRequest { field: field.to_string(), size: 20, search: None })
        .collect();

    let page_size = clamp_page_size(params.page_size);
    let query = SearchQuery {
        text_query: params.search,
        filters,
        date_filters: BTreeMap::<String, DateRange>::new(),
        facets,
        page: params.page.max(1),
        page_size,
    };

    let results = state.search.search(&state.index, &query).await.map_err(store_error)?;
    let facets = results
        .facets
        .into_iter()
        .map(|(field, buckets)| {
            let values = buckets
                .into_iter()
                .map(|b| serde_json::json!({ "value": b.value, "count": b.count }))
                .collect();
            (field, values)
        })
        .collect();

    Ok(Json(ModelsResponse {
        hits: results.hits,
        total: results.total,
        page: query.page,
        page_size: query.page_size,
        facets,
    }))
}

#[derive(Debug, Deserialize)]
struct GetModelParams {
    #[serde(default)]
    include_entities: bool,
}

/// `GET /models/{id}?include_entities` (§6.5): looks `id` up as an indexed
/// `identifier` value (either the MLentory IRI or the platform's native id).
async fn get_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<GetModelParams>,
) -> ApiResult<JsonValue> {
    let mut filters = BTreeMap::new();
    filters.insert("identifier".to_string(), vec![id.clone()]);
    let query = SearchQuery { filters, page: 1, page_size: 1, ..Default::default() };

    let results = state.search.search(&state.index, &query).await.map_err(store_error)?;
    let Some(mut document) = results.hits.into_iter().next() else {
        return Err((StatusCode::NOT_FOUND, Json(ApiError::new("NOT_FOUND", format!("no model found for id '{id}'")))));
    };

    if params.include_entities {
        if let Ok(neighborhood) = state.explorer.explore(&id, Direction::Outgoing, None).await {
            let nodes: Vec<JsonValue> = neighborhood
                .nodes
                .into_iter()
                .map(|n| serde_json::json!({"id": n.id, "labels": n.labels, "properties": n.properties}))
                .collect();
            document["linkedEntities"] = JsonValue::Array(nodes);
        }
    }

    Ok(Json(document))
}

#[derive(Debug, Deserialize)]
struct GraphParams {
    #[serde(default)]
    relationships: Option<String>,
}

#[derive(Debug, Serialize)]
struct GraphResponse {
    entity_id: String,
    depth: u32,
    direction: &'static str,
    nodes: Vec<JsonValue>,
    edges: Vec<JsonValue>,
}

/// `GET /graph/{id}?relationships=rel1,rel2` (§4.10, §6.5). Depth is always 1
/// and direction is always outgoing - see [`mlentory_neo4j::GraphExplorer`].
async fn get_graph(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<GraphParams>,
) -> ApiResult<GraphResponse> {
    let relationships: Option<Vec<String>> = params
        .relationships
        .map(|csv| csv.split(',').map(str::trim).filter(|r| !r.is_empty()).map(str::to_string).collect());

    let result = state
        .explorer
        .explore(&id, Direction::Outgoing, relationships.as_deref())
        .await
        .map_err(store_error)?;

    Ok(Json(GraphResponse {
        entity_id: result.metadata.entity_id,
        depth: result.metadata.depth,
        direction: result.metadata.direction,
        nodes: result.nodes.into_iter().map(|n| serde_json::json!({"id": n.id, "labels": n.labels, "properties": n.properties})).collect(),
        edges: result
            .edges
            .into_iter()
            .map(|e| serde_json::json!({"source": e.source, "target": e.target, "relationshipType": e.relationship_type}))
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
struct PlatformStats {
    platforms: Vec<JsonValue>,
}

/// `GET /stats/platform` (§6.5): per-platform model counts via the `platform`
/// facet on a match-all query.
async fn platform_stats(State(state): State<AppState>) -> ApiResult<PlatformStats> {
    let query = SearchQuery {
        facets: vec![FacetRequest { field: "platform".to_string(), size: 100, search: None }],
        page: 1,
        page_size: 1,
        ..Default::default()
    };
    let results = state.search.search(&state.index, &query).await.map_err(store_error)?;
    let platforms = results
        .facets
        .get("platform")
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|b| serde_json::json!({ "platform": b.value, "count": b.count }))
        .collect();
    Ok(Json(PlatformStats { platforms }))
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    elasticsearch: bool,
    neo4j: bool,
}

/// `GET /health` (§6.5): pings both backing stores without requiring either
/// to contain data.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let es_ok = state
        .search
        .search(&state.index, &SearchQuery { page_size: 1, ..Default::default() })
        .await
        .is_ok();

    let neo4j_ok = matches!(
        state.explorer.explore("__mlentory_health_check__", Direction::Outgoing, None).await,
        Ok(_) | Err(CoreError::Other(_))
    );

    let status = HealthStatus { elasticsearch: es_ok, neo4j: neo4j_ok };
    let code = if status.elasticsearch && status.neo4j { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(status))
}
