//! `mlentory run <platform>`: extract -> normalize -> (optionally) load, wired
//! as a [`StageGraph`] over the platform's [`SourceExtractor`] (§4.1, §4.2, §4.5).

use crate::output::{print_error, print_info, print_success};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::Args;
use mlentory_ai4life::{Ai4LifeConfig, Ai4LifeExtractor};
use mlentory_arxiv::{ArxivClient, ArxivClientConfig};
use mlentory_core::config::{RunConfig, StoreSecrets};
use mlentory_core::enrich::EnrichmentClient;
use mlentory_core::error::Error as CoreError;
use mlentory_core::identify::{
    identify_articles, identify_articles_per_record, identify_base_models_per_record,
    identify_datasets, identify_datasets_per_record, identify_keywords, identify_keywords_per_record,
    identify_languages, identify_languages_per_record, identify_licenses, identify_licenses_per_record,
    identify_tasks, identify_tasks_per_record, RawRecord,
};
use mlentory_core::iri::{mint_iri, EntityKind};
use mlentory_core::model::MlModel;
use mlentory_core::normalize::{build_translation_map, validate_batch, EntityLinkage};
use mlentory_core::rdf::{
    build_article_triples, build_dataset_triples, build_language_triples, build_license_triples,
    build_term_triples, choose_subject,
};
use mlentory_core::run::{RunId, RunPaths, StageTier};
use mlentory_core::temporal::{mlmodel_temporal_fields, write_metadata};
use mlentory_core::{Stage, StageGraph, StageInputs, StageOutput};
use mlentory_croissant::{CroissantClient, CroissantClientConfig};
use mlentory_elasticsearch::DocumentIndexer;
use mlentory_huggingface::{HuggingFaceConfig, HuggingFaceExtractor};
use mlentory_neo4j::{Neo4jStore, Neo4jTemporalStore, Neo4jTripleStore};
use mlentory_openml::{OpenMlConfig, OpenMlExtractor};
use mlentory_observability::metrics_registry;
use mlentory_pycountry::{PycountryClient, PycountryClientConfig};
use mlentory_spdx::{SpdxClient, SpdxClientConfig};
use mlentory_wikipedia::KeywordClient;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Platform to run the pipeline for (huggingface, openml, ai4life).
    pub platform: String,

    /// Run configuration YAML (§6.4). Missing file falls back to all-defaults.
    #[arg(long, default_value = "config/etl/run_config.yaml")]
    pub config: PathBuf,

    /// Root directory run artifacts are written under, overriding the config file.
    #[arg(long)]
    pub data_root: Option<String>,

    /// Persist triples to Neo4j and index documents in Elasticsearch after
    /// normalization (needs MLENTORY_NEO4J_*/MLENTORY_ELASTICSEARCH_HOST set).
    #[arg(long)]
    pub load: bool,

    /// Elasticsearch index to write into.
    #[arg(long, default_value = "mlentory")]
    pub index: String,
}

fn build_extractor(
    platform: &str,
    cfg: &mlentory_core::config::PlatformConfig,
) -> Result<Arc<dyn mlentory_core::SourceExtractor>> {
    match platform {
        "huggingface" => {
            let mut hf = HuggingFaceConfig::default();
            if let Some(base_url) = &cfg.base_url {
                hf.base_url = base_url.clone();
            }
            if let Some(n) = cfg.num_models {
                hf.num_models = n;
            }
            hf.offset = cfg.offset;
            hf.update_recent = cfg.update_recent;
            Ok(Arc::new(HuggingFaceExtractor::new(hf)))
        }
        "openml" => {
            let mut om = OpenMlConfig::default();
            if let Some(base_url) = &cfg.base_url {
                om.base_url = base_url.clone();
            }
            if let Some(n) = cfg.num_instances {
                om.num_instances = n;
            }
            om.offset = cfg.offset;
            Ok(Arc::new(OpenMlExtractor::new(om)))
        }
        "ai4life" => {
            let ai = Ai4LifeConfig {
                models_file_path: cfg.models_file_path.clone().map(PathBuf::from),
                base_url: cfg.base_url.clone(),
                parent_id: cfg.parent_id.clone(),
                enable_scraping: cfg.enable_scraping,
            };
            Ok(Arc::new(Ai4LifeExtractor::new(ai)))
        }
        other => Err(anyhow!("unknown platform '{other}' (expected huggingface, openml, or ai4life)")),
    }
}

/// `FetchPrimary`: calls the platform extractor and writes `1_raw/records.json`
/// (NDJSON, one [`RawRecord`] per line) plus the original payloads (§4.2, §6.1).
struct ExtractStage {
    platform: String,
    paths: RunPaths,
    extractor: Arc<dyn mlentory_core::SourceExtractor>,
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> &str {
        "extract"
    }

    fn depends_on(&self) -> &[String] {
        &[]
    }

    async fn run(&self, _inputs: &StageInputs) -> mlentory_core::Result<StageOutput> {
        let fetch = self.extractor.fetch_primary().await?;

        let records_path = self.paths.artifact_path(StageTier::Raw, "records.json")?;
        let mut ndjson = String::new();
        for record in &fetch.records {
            ndjson.push_str(&serde_json::to_string(record)?);
            ndjson.push('\n');
        }
        std::fs::write(&records_path, ndjson)?;

        let payloads_path = self.paths.artifact_path(StageTier::Raw, "raw_payloads.json")?;
        std::fs::write(&payloads_path, serde_json::to_string_pretty(&fetch.raw_payloads)?)?;

        Ok(StageOutput(serde_json::json!({
            "platform": self.platform,
            "records_path": records_path,
            "record_count": fetch.records.len(),
            "fetched_at": fetch.fetched_at,
        })))
    }
}

/// `BuildTriples`'s upstream neighbor: identification, entity linkage, stub
/// [`MlModel`] construction, and validation (§4.3, §4.5). Writes every
/// `2_normalized/` artifact named in §6.1.
struct NormalizeStage {
    platform: String,
    paths: RunPaths,
    known_tasks: BTreeSet<String>,
    enrichment_threads: usize,
    deps: Vec<String>,
}

#[async_trait]
impl Stage for NormalizeStage {
    fn name(&self) -> &str {
        "normalize"
    }

    fn depends_on(&self) -> &[String] {
        &self.deps
    }

    async fn run(&self, _inputs: &StageInputs) -> mlentory_core::Result<StageOutput> {
        let records_path = self.paths.tier_dir(StageTier::Raw).join("records.json");
        let text = tokio::fs::read_to_string(&records_path)
            .await
            .map_err(|e| CoreError::transient("filesystem", e))?;
        let records: Vec<RawRecord> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?;

        let datasets_by_record = identify_datasets_per_record(&records);
        let articles_by_record = identify_articles_per_record(&records);
        let base_models_by_record = identify_base_models_per_record(&records);
        let licenses_by_record = identify_licenses_per_record(&records);
        let languages_by_record = identify_languages_per_record(&records);
        let tasks_by_record = identify_tasks_per_record(&records, &self.known_tasks);
        let keywords_by_record = identify_keywords_per_record(&records);

        let empty: Vec<String> = Vec::new();
        let mut models = Vec::with_capacity(records.len());
        let mut linkage_by_record = std::collections::BTreeMap::new();
        for record in &records {
            let linkage = EntityLinkage::from_raw_ids(
                &self.platform,
                datasets_by_record.get(&record.id).unwrap_or(&empty),
                articles_by_record.get(&record.id).unwrap_or(&empty),
                base_models_by_record.get(&record.id).unwrap_or(&empty),
                keywords_by_record.get(&record.id).unwrap_or(&empty),
                licenses_by_record.get(&record.id).unwrap_or(&empty),
                languages_by_record.get(&record.id).unwrap_or(&empty),
                tasks_by_record.get(&record.id).unwrap_or(&empty),
            );

            let mut model = MlModel {
                identifier: vec![mint_iri(EntityKind::MlModel, &self.platform, &record.id), record.id.clone()],
                name: Some(record.id.clone()),
                description: (!record.card_text.is_empty()).then(|| record.card_text.chars().take(500).collect()),
                ..MlModel::default()
            };
            linkage.merge_into(&mut model);
            linkage_by_record.insert(record.id.clone(), linkage);
            models.push(model);
        }

        let (ok_models, errors) = validate_batch(models);
        if ok_models.is_empty() && !records.is_empty() {
            return Err(CoreError::EmptyOutput { stage: "normalize".to_string() });
        }

        let normalized_dir = self.paths.tier_dir(StageTier::Normalized);
        tokio::fs::create_dir_all(&normalized_dir)
            .await
            .map_err(CoreError::Io)?;

        let mlmodels_path = normalized_dir.join("mlmodels.json");
        let mut ndjson = String::new();
        for model in &ok_models {
            ndjson.push_str(&serde_json::to_string(model)?);
            ndjson.push('\n');
        }
        tokio::fs::write(&mlmodels_path, ndjson).await.map_err(CoreError::Io)?;

        tokio::fs::write(
            normalized_dir.join("mlmodel_transformation_errors.json"),
            serde_json::to_string_pretty(&errors)?,
        )
        .await
        .map_err(CoreError::Io)?;

        let dataset_ids: Vec<String> = identify_datasets(&records).into_iter().collect();
        let article_ids: Vec<String> = identify_articles(&records).into_iter().collect();
        let license_ids: Vec<String> = identify_licenses(&records).into_iter().collect();
        let language_ids: Vec<String> = identify_languages(&records).into_iter().collect();
        let task_ids: Vec<String> = identify_tasks(&records, &self.known_tasks).into_iter().collect();
        let keyword_ids: Vec<String> = identify_keywords(&records).into_iter().collect();

        let croissant = CroissantClient::new(CroissantClientConfig {
            concurrency: self.enrichment_threads,
            ..CroissantClientConfig::default()
        });
        let dataset_records = croissant.fetch_specific(&dataset_ids).await;
        write_ndjson(&normalized_dir.join("datasets.json"), &dataset_records).await?;

        let arxiv = ArxivClient::new(ArxivClientConfig {
            concurrency: self.enrichment_threads,
            ..ArxivClientConfig::default()
        });
        let article_records = arxiv.fetch_specific(&article_ids).await;
        write_ndjson(&normalized_dir.join("articles.json"), &article_records).await?;

        let spdx = SpdxClient::load(SpdxClientConfig {
            concurrency: self.enrichment_threads,
            ..SpdxClientConfig::default()
        })
        .await
        .unwrap_or_else(|reason| {
            tracing::warn!(%reason, "falling back to an empty spdx license catalog");
            SpdxClient::with_catalog(Vec::new(), self.enrichment_threads)
        });
        let license_records = spdx.fetch_specific(&license_ids).await;
        write_ndjson(&normalized_dir.join("licenses.json"), &license_records).await?;

        let pycountry = PycountryClient::new(PycountryClientConfig {
            concurrency: self.enrichment_threads,
        });
        let language_records = pycountry.fetch_specific(&language_ids).await;
        write_ndjson(&normalized_dir.join("languages.json"), &language_records).await?;

        let keyword_client = load_keyword_client(&self.paths, self.enrichment_threads);
        let task_records = keyword_client.fetch_specific(&task_ids).await;
        write_ndjson(&normalized_dir.join("tasks.json"), &task_records).await?;
        let keyword_records = keyword_client.fetch_specific(&keyword_ids).await;
        write_ndjson(&normalized_dir.join("keywords.json"), &keyword_records).await?;

        tokio::fs::write(
            normalized_dir.join("entity_linking.json"),
            serde_json::to_string_pretty(&linkage_by_record)?,
        )
        .await
        .map_err(CoreError::Io)?;

        let translation_map = build_translation_map(&ok_models, &std::collections::BTreeMap::new());
        tokio::fs::write(
            normalized_dir.join("translation_mapping.json"),
            serde_json::to_string_pretty(&translation_map)?,
        )
        .await
        .map_err(CoreError::Io)?;

        metrics_registry()
            .records_stubbed
            .with_label_values(&[self.platform.as_str()])
            .inc_by(ok_models.len() as u64);

        Ok(StageOutput(serde_json::json!({
            "mlmodels_path": mlmodels_path,
            "model_count": ok_models.len(),
            "error_count": errors.len(),
        })))
    }
}

/// `PersistAndExport` + `EnsureIndex`/`IndexModel` (§4.6, §4.8), run only with
/// `--load`; otherwise a no-op so `mlentory run` stays usable without live
/// stores during development.
struct LoadStage {
    platform: String,
    paths: RunPaths,
    index: String,
    enabled: bool,
    deps: Vec<String>,
}

#[async_trait]
impl Stage for LoadStage {
    fn name(&self) -> &str {
        "load"
    }

    fn depends_on(&self) -> &[String] {
        &self.deps
    }

    async fn run(&self, _inputs: &StageInputs) -> mlentory_core::Result<StageOutput> {
        if !self.enabled {
            return Ok(StageOutput(serde_json::json!({"skipped": true})));
        }

        let secrets = StoreSecrets::from_env()?;
        let normalized_dir = self.paths.tier_dir(StageTier::Normalized);
        let mlmodels_path = normalized_dir.join("mlmodels.json");
        let rdf_dir = self.paths.tier_dir(StageTier::Rdf);
        tokio::fs::create_dir_all(&rdf_dir).await.map_err(CoreError::Io)?;
        let ttl_path = rdf_dir.join("mlmodel.ttl");

        let neo4j = Neo4jStore::connect(&secrets.neo4j_uri, &secrets.neo4j_user, &secrets.neo4j_password).await?;
        let triple_store = Neo4jTripleStore::new(neo4j.clone());
        let stats = triple_store.persist_and_export(&mlmodels_path, &ttl_path, 100).await?;
        tokio::fs::write(
            rdf_dir.join("mlmodel_load_report.json"),
            serde_json::to_string_pretty(&serde_json::json!({
                "records_written": stats.records_written,
                "triples_written": stats.triples_written,
            }))?,
        )
        .await
        .map_err(CoreError::Io)?;
        metrics_registry()
            .triples_written
            .with_label_values(&["neo4j"])
            .inc_by(stats.triples_written as u64);

        let mut entity_reports = serde_json::Map::new();
        let dataset_stats = triple_store
            .persist_enriched_entities(
                &normalized_dir.join("datasets.json"),
                &rdf_dir.join("dataset.ttl"),
                100,
                build_dataset_triples,
            )
            .await?;
        entity_reports.insert("dataset".to_string(), serde_json::json!({
            "records_written": dataset_stats.records_written,
            "triples_written": dataset_stats.triples_written,
        }));

        let article_stats = triple_store
            .persist_enriched_entities(
                &normalized_dir.join("articles.json"),
                &rdf_dir.join("article.ttl"),
                100,
                build_article_triples,
            )
            .await?;
        entity_reports.insert("article".to_string(), serde_json::json!({
            "records_written": article_stats.records_written,
            "triples_written": article_stats.triples_written,
        }));

        let license_stats = triple_store
            .persist_enriched_entities(
                &normalized_dir.join("licenses.json"),
                &rdf_dir.join("license.ttl"),
                100,
                build_license_triples,
            )
            .await?;
        entity_reports.insert("license".to_string(), serde_json::json!({
            "records_written": license_stats.records_written,
            "triples_written": license_stats.triples_written,
        }));

        let language_stats = triple_store
            .persist_enriched_entities(
                &normalized_dir.join("languages.json"),
                &rdf_dir.join("language.ttl"),
                100,
                build_language_triples,
            )
            .await?;
        entity_reports.insert("language".to_string(), serde_json::json!({
            "records_written": language_stats.records_written,
            "triples_written": language_stats.triples_written,
        }));

        let task_stats = triple_store
            .persist_enriched_entities(
                &normalized_dir.join("tasks.json"),
                &rdf_dir.join("task.ttl"),
                100,
                build_term_triples,
            )
            .await?;
        entity_reports.insert("task".to_string(), serde_json::json!({
            "records_written": task_stats.records_written,
            "triples_written": task_stats.triples_written,
        }));

        let keyword_stats = triple_store
            .persist_enriched_entities(
                &normalized_dir.join("keywords.json"),
                &rdf_dir.join("keyword.ttl"),
                100,
                build_term_triples,
            )
            .await?;
        entity_reports.insert("keyword".to_string(), serde_json::json!({
            "records_written": keyword_stats.records_written,
            "triples_written": keyword_stats.triples_written,
        }));

        let entities_triples_written = dataset_stats.triples_written
            + article_stats.triples_written
            + license_stats.triples_written
            + language_stats.triples_written
            + task_stats.triples_written
            + keyword_stats.triples_written;
        tokio::fs::write(
            rdf_dir.join("entities_load_report.json"),
            serde_json::to_string_pretty(&entity_reports)?,
        )
        .await
        .map_err(CoreError::Io)?;
        metrics_registry()
            .triples_written
            .with_label_values(&["neo4j"])
            .inc_by(entities_triples_written as u64);

        let temporal_store = Neo4jTemporalStore::new(neo4j);
        let run_ts = Utc::now();
        let mlmodels_text = tokio::fs::read_to_string(&mlmodels_path).await.map_err(CoreError::Io)?;
        for line in mlmodels_text.lines().filter(|l| !l.trim().is_empty()) {
            let model: MlModel = serde_json::from_str(line)?;
            let model_uri = choose_subject(EntityKind::MlModel, &model.identifier);
            write_metadata(&temporal_store, &model_uri, &mlmodel_temporal_fields(&model), run_ts).await?;
        }

        let indexer = DocumentIndexer::new(&secrets.elasticsearch_host)?;
        indexer.ensure_index(&self.index).await?;
        let translation_map: mlentory_elasticsearch::TranslationMap = serde_json::from_str(
            &tokio::fs::read_to_string(normalized_dir.join("translation_mapping.json"))
                .await
                .map_err(CoreError::Io)?,
        )?;
        let mut indexed = 0usize;
        for line in mlmodels_text.lines().filter(|l| !l.trim().is_empty()) {
            let model: MlModel = serde_json::from_str(line)?;
            indexer.index_model(&self.index, &self.platform, &model, &translation_map).await?;
            indexed += 1;
        }
        tokio::fs::write(
            rdf_dir.join("elasticsearch_report.json"),
            serde_json::to_string_pretty(&serde_json::json!({"documents_indexed": indexed}))?,
        )
        .await
        .map_err(CoreError::Io)?;
        metrics_registry()
            .documents_indexed
            .with_label_values(&[self.platform.as_str()])
            .inc_by(indexed as u64);

        Ok(StageOutput(serde_json::json!({
            "records_written": stats.records_written,
            "triples_written": stats.triples_written,
            "entities_triples_written": entities_triples_written,
            "documents_indexed": indexed,
        })))
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let cfg = RunConfig::load(&args.config).unwrap_or_else(|_| {
        tracing::warn!(path = %args.config.display(), "run config not found, using defaults");
        RunConfig::default()
    });
    let platform_cfg = cfg.platform(&args.platform);
    let data_root = args.data_root.clone().unwrap_or(cfg.general.data_root.clone());

    let run_id = RunId::generate(Utc::now());
    print_info(&format!("starting run {run_id} for platform '{}'", args.platform));
    let paths = RunPaths::new(data_root, args.platform.clone(), run_id);

    let extractor = build_extractor(&args.platform, &platform_cfg)?;

    let known_tasks = load_known_tasks(&paths.refs_dir().join("hf_tasks.csv")).await;

    let mut graph = StageGraph::new();
    graph.add_stage(Arc::new(ExtractStage {
        platform: args.platform.clone(),
        paths: paths.clone(),
        extractor,
    }));
    graph.add_stage(Arc::new(NormalizeStage {
        platform: args.platform.clone(),
        paths: paths.clone(),
        known_tasks,
        enrichment_threads: platform_cfg.enrichment_threads,
        deps: vec!["extract".to_string()],
    }));
    graph.add_stage(Arc::new(LoadStage {
        platform: args.platform.clone(),
        paths: paths.clone(),
        index: args.index.clone(),
        enabled: args.load,
        deps: vec!["normalize".to_string()],
    }));

    let results = graph.materialize().await.context("pipeline graph is malformed")?;
    for stage_name in ["extract", "normalize", "load"] {
        match &results[stage_name] {
            mlentory_core::StageResult::Ok(output) => {
                print_success(&format!("{stage_name}: {}", output.0));
            }
            mlentory_core::StageResult::Err(message) => {
                print_error(&format!("{stage_name} failed: {message}"));
            }
            mlentory_core::StageResult::UpstreamFailed { failed_dependency } => {
                print_error(&format!("{stage_name} skipped: upstream stage '{failed_dependency}' failed"));
            }
        }
    }

    if !results["extract"].is_ok() || !results["normalize"].is_ok() {
        return Err(anyhow!("pipeline run did not complete successfully"));
    }
    Ok(())
}

async fn load_known_tasks(path: &std::path::Path) -> BTreeSet<String> {
    let Ok(text) = tokio::fs::read_to_string(path).await else {
        return BTreeSet::new();
    };
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut tasks = BTreeSet::new();
    for record in reader.records().flatten() {
        if let Some(task) = record.get(0) {
            tasks.insert(task.to_string());
        }
    }
    tasks
}

/// Loads the curated keyword/task CSV from `refs/`; a missing or malformed
/// file falls back to an empty curated map rather than failing the run (the
/// client still resolves terms via its Wikipedia fallback).
fn load_keyword_client(paths: &RunPaths, concurrency: usize) -> KeywordClient {
    let csv_path = paths.refs_dir().join("keywords.csv");
    KeywordClient::load(&csv_path, concurrency).unwrap_or_else(|reason| {
        tracing::warn!(path = %csv_path.display(), %reason, "falling back to an empty curated keyword map");
        KeywordClient::with_curated(std::collections::HashMap::new(), concurrency)
    })
}

/// Writes one [`mlentory_core::enrich::EnrichedRecord`] per line (NDJSON), the
/// shape every `2_normalized/<kind>.json` enrichment artifact takes (§6.1).
async fn write_ndjson<T: serde::Serialize>(path: &std::path::Path, records: &[T]) -> mlentory_core::Result<()> {
    let mut ndjson = String::new();
    for record in records {
        ndjson.push_str(&serde_json::to_string(record)?);
        ndjson.push('\n');
    }
    tokio::fs::write(path, ndjson).await.map_err(CoreError::Io)
}
