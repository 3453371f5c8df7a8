//! Pipeline runtime (§4.1): typed stages with named input edges, materialized
//! by resolving the dependency DAG wave by wave. Stages within a wave (no edge
//! between them) run concurrently; a stage failure halts its downstream branch
//! but leaves sibling branches to complete (§4.1 failure policy).

use crate::error::{Error, Result};
use async_trait::async_trait;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An opaque reference to a stage's materialized artifact: in practice a
/// filesystem path plus whatever small values the downstream stage needs, kept
/// as JSON so the runtime stays agnostic to each stage's concrete output type.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput(pub serde_json::Value);

/// The resolved outputs of a stage's declared dependencies, keyed by upstream
/// stage name.
pub type StageInputs = BTreeMap<String, StageOutput>;

/// A node in the pipeline DAG.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable name, used both as this stage's own key and as the key other
    /// stages reference in [`Stage::depends_on`].
    fn name(&self) -> &str;

    /// Names of the stages whose outputs this stage consumes.
    fn depends_on(&self) -> &[String];

    /// Run this stage given its resolved dependency outputs. Given identical
    /// inputs, implementations are expected to produce the same artifact set
    /// (§4.1 "stages are pure with respect to their run folder").
    async fn run(&self, inputs: &StageInputs) -> Result<StageOutput>;
}

/// Outcome of materializing one stage: its own result, or an error recording
/// that an upstream dependency failed so this stage never ran.
#[derive(Debug, Clone)]
pub enum StageResult {
    Ok(StageOutput),
    Err(String),
    UpstreamFailed { failed_dependency: String },
}

impl StageResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    #[must_use]
    pub fn output(&self) -> Option<&StageOutput> {
        match self {
            Self::Ok(o) => Some(o),
            _ => None,
        }
    }
}

/// A registered set of stages, materialized by resolving the dependency graph.
pub struct StageGraph {
    stages: Vec<Arc<dyn Stage>>,
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StageGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Topologically validate the graph and group stages into waves: each wave
    /// contains stages whose dependencies are all in a prior wave, so stages
    /// within one wave have no edge between them and may run concurrently.
    fn waves(&self) -> Result<Vec<Vec<Arc<dyn Stage>>>> {
        let mut graph = DiGraph::<String, ()>::new();
        let mut index_by_name = BTreeMap::new();
        for stage in &self.stages {
            let idx = graph.add_node(stage.name().to_string());
            index_by_name.insert(stage.name().to_string(), idx);
        }
        for stage in &self.stages {
            let Some(&to) = index_by_name.get(stage.name()) else {
                continue;
            };
            for dep in stage.depends_on() {
                let Some(&from) = index_by_name.get(dep) else {
                    return Err(Error::configuration(format!(
                        "stage {} declares unknown dependency {dep}",
                        stage.name()
                    )));
                };
                graph.add_edge(from, to, ());
            }
        }
        if toposort(&graph, None).is_err() {
            return Err(Error::configuration("stage dependency graph contains a cycle"));
        }

        let mut resolved: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        let mut remaining: Vec<Arc<dyn Stage>> = self.stages.clone();
        let mut waves = Vec::new();
        while !remaining.is_empty() {
            let (ready, not_ready): (Vec<_>, Vec<_>) = remaining
                .into_iter()
                .partition(|s| s.depends_on().iter().all(|d| resolved.contains(d)));
            if ready.is_empty() {
                return Err(Error::configuration("stage dependency graph contains a cycle"));
            }
            for s in &ready {
                resolved.insert(s.name().to_string());
            }
            waves.push(ready);
            remaining = not_ready;
        }
        Ok(waves)
    }

    /// Resolve the DAG and run every stage, wave by wave. Returns every stage's
    /// outcome by name; never returns `Err` for a single stage's runtime
    /// failure (that's recorded in [`StageResult::Err`]) — only for a
    /// malformed graph (unknown dependency, cycle).
    pub async fn materialize(&self) -> Result<BTreeMap<String, StageResult>> {
        let waves = self.waves()?;
        let mut results: BTreeMap<String, StageResult> = BTreeMap::new();

        for wave in waves {
            let futures = wave.into_iter().map(|stage| {
                let deps = stage.depends_on().to_vec();
                let upstream_failure = deps.iter().find_map(|d| match results.get(d) {
                    Some(StageResult::Ok(_)) | None => None,
                    Some(_) => Some(d.clone()),
                });
                let inputs: StageInputs = deps
                    .iter()
                    .filter_map(|d| match results.get(d) {
                        Some(StageResult::Ok(output)) => Some((d.clone(), output.clone())),
                        _ => None,
                    })
                    .collect();
                async move {
                    let name = stage.name().to_string();
                    if let Some(failed_dep) = upstream_failure {
                        return (
                            name,
                            StageResult::UpstreamFailed {
                                failed_dependency: failed_dep,
                            },
                        );
                    }
                    match stage.run(&inputs).await {
                        Ok(output) => (name, StageResult::Ok(output)),
                        Err(e) => (name, StageResult::Err(e.to_string())),
                    }
                }
            });
            for (name, result) in futures::future::join_all(futures).await {
                results.insert(name, result);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStage {
        name: String,
        deps: Vec<String>,
        fails: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Stage for FixedStage {
        fn name(&self) -> &str {
            &self.name
        }
        fn depends_on(&self) -> &[String] {
            &self.deps
        }
        async fn run(&self, _inputs: &StageInputs) -> Result<StageOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                Err(Error::other("boom"))
            } else {
                Ok(StageOutput(serde_json::json!({"ok": true})))
            }
        }
    }

    fn stage(name: &str, deps: &[&str], fails: bool, calls: &Arc<AtomicUsize>) -> Arc<dyn Stage> {
        Arc::new(FixedStage {
            name: name.to_string(),
            deps: deps.iter().map(|s| s.to_string()).collect(),
            fails,
            calls: Arc::clone(calls),
        })
    }

    #[tokio::test]
    async fn independent_stages_all_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = StageGraph::new();
        graph.add_stage(stage("extract_a", &[], false, &calls));
        graph.add_stage(stage("extract_b", &[], false, &calls));
        let results = graph.materialize().await.unwrap();
        assert!(results["extract_a"].is_ok());
        assert!(results["extract_b"].is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn downstream_runs_only_after_upstream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = StageGraph::new();
        graph.add_stage(stage("extract", &[], false, &calls));
        graph.add_stage(stage("normalize", &["extract"], false, &calls));
        let results = graph.materialize().await.unwrap();
        assert!(results["normalize"].is_ok());
    }

    #[tokio::test]
    async fn failure_halts_only_its_own_branch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = StageGraph::new();
        graph.add_stage(stage("extract_a", &[], true, &calls));
        graph.add_stage(stage("extract_b", &[], false, &calls));
        graph.add_stage(stage("normalize_a", &["extract_a"], false, &calls));
        graph.add_stage(stage("normalize_b", &["extract_b"], false, &calls));
        let results = graph.materialize().await.unwrap();
        assert!(!results["extract_a"].is_ok());
        assert!(matches!(
            results["normalize_a"],
            StageResult::UpstreamFailed { .. }
        ));
        assert!(results["extract_b"].is_ok());
        assert!(results["normalize_b"].is_ok());
    }

    #[tokio::test]
    async fn unknown_dependency_is_a_configuration_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = StageGraph::new();
        graph.add_stage(stage("normalize", &["does_not_exist"], false, &calls));
        assert!(graph.materialize().await.is_err());
    }

    #[tokio::test]
    async fn cyclic_graph_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = StageGraph::new();
        graph.add_stage(stage("a", &["b"], false, &calls));
        graph.add_stage(stage("b", &["a"], false, &calls));
        assert!(graph.materialize().await.is_err());
    }
}
