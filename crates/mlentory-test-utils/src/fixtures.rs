//! Sample values and scratch directories for tests that exercise the
//! identification, normalization, and filesystem-artifact layers without a
//! live platform or store.

use chrono::{TimeZone, Utc};
use mlentory_core::identify::RawRecord;
use mlentory_core::model::MlModel;
use mlentory_core::run::{RunId, RunPaths};
use std::collections::BTreeMap;
use tempfile::TempDir;

/// A record with one signal of each kind identification looks for: a dataset
/// tag, an arXiv id embedded in the card text, a base model tag, a license
/// tag, and a `pipeline_tag`.
#[must_use]
pub fn sample_raw_record(id: &str) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        tags: vec![
            "dataset:squad".to_string(),
            "base_model:bert-base-uncased".to_string(),
            "license:apache-2.0".to_string(),
            "en".to_string(),
        ],
        card_text: format!("Fine-tuned on SQuAD, described in arXiv:1810.04805. Model id: {id}."),
        pipeline_tag: Some("text-classification".to_string()),
        library_name: Some("transformers".to_string()),
        fields: BTreeMap::new(),
    }
}

/// `n` distinct records built from [`sample_raw_record`], ids `sample-0..sample-{n-1}`.
#[must_use]
pub fn sample_raw_records(n: usize) -> Vec<RawRecord> {
    (0..n).map(|i| sample_raw_record(&format!("sample-{i}"))).collect()
}

/// A record with none of the optional signals set, for exercising the empty
/// path through each identifier.
#[must_use]
pub fn bare_raw_record(id: &str) -> RawRecord {
    RawRecord { id: id.to_string(), ..RawRecord::default() }
}

/// A minimally valid [`MlModel`]: carries an MLentory IRI plus the platform's
/// native id, so it passes [`mlentory_core::normalize::validate_mlmodel`].
#[must_use]
pub fn sample_mlmodel(platform: &str, id: &str) -> MlModel {
    MlModel {
        identifier: vec![
            mlentory_core::iri::mint_iri(mlentory_core::iri::EntityKind::MlModel, platform, id),
            format!("https://{platform}.example/{id}"),
        ],
        name: Some(id.to_string()),
        description: Some(format!("Sample model {id} for tests.")),
        ..MlModel::default()
    }
}

/// A fixed, deterministic timestamp (2024-01-15T12:00:00Z) for tests that
/// need a stable `RunId`/snapshot timestamp rather than `Utc::now()`.
#[must_use]
pub fn fixed_timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// A temporary data root plus a [`RunPaths`] rooted in it, for tests that
/// write and read back `1_raw`/`2_normalized`/`3_rdf` artifacts. The
/// `TempDir` must be kept alive for as long as the paths are used.
#[must_use]
pub fn scratch_run_paths(platform: &str) -> (TempDir, RunPaths) {
    let dir = TempDir::new().expect("create temp data root");
    let run_id = RunId::new(fixed_timestamp(), "abcdef");
    let paths = RunPaths::new(dir.path().to_string_lossy().to_string(), platform.to_string(), run_id);
    (dir, paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_raw_records_have_distinct_ids() {
        let records = sample_raw_records(3);
        let ids: std::collections::BTreeSet<_> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn sample_mlmodel_passes_validation() {
        let model = sample_mlmodel("huggingface", "bert-base-uncased");
        assert!(mlentory_core::normalize::validate_mlmodel(&model).is_ok());
    }

    #[test]
    fn scratch_run_paths_creates_tier_directories_lazily() {
        let (_dir, paths) = scratch_run_paths("huggingface");
        let artifact = paths.artifact_path(mlentory_core::run::StageTier::Raw, "records.json").unwrap();
        assert!(artifact.parent().unwrap().is_dir());
    }
}
