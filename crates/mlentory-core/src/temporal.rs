//! Temporal metadata graph (§4.7, §3.3): per-predicate snapshots with validity
//! intervals, content-hashed change detection, and point-in-time reconstruction.
//!
//! The write/reconstruct *algorithm* lives here as pure, store-agnostic
//! functions; a backing store only needs to implement [`TemporalStore`] to look
//! up currently-open snapshots and apply the resulting plan. This keeps the
//! algorithm itself covered by the property tests in §8 without a live Neo4j
//! instance.

use crate::iri::is_absolute_iri;
use crate::model::{ExtractionMetadata, MlModel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One `(model, predicate, value)` extraction at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySnapshot {
    pub hash: String,
    pub predicate: String,
    pub value: String,
    pub value_uri: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

/// Compute a snapshot's content hash (§3.3): identical hashes never produce a
/// new snapshot.
#[must_use]
pub fn snapshot_hash(predicate: &str, value: &str, value_uri: Option<&str>, meta: &ExtractionMetadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(predicate.as_bytes());
    hasher.update(b"\0");
    hasher.update(value.as_bytes());
    hasher.update(b"\0");
    hasher.update(value_uri.unwrap_or("").as_bytes());
    hasher.update(b"\0");
    hasher.update(meta.method.as_bytes());
    hasher.update(b"\0");
    hasher.update(meta.confidence.to_bits().to_be_bytes());
    hasher.update(b"\0");
    hasher.update(meta.notes.as_deref().unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
}

/// One candidate snapshot derived from a model's current field values, before
/// comparison against what is already open in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub predicate: String,
    pub value: String,
    pub value_uri: Option<String>,
    pub hash: String,
}

impl Candidate {
    #[must_use]
    pub fn new(predicate: impl Into<String>, value: impl Into<String>, value_uri: Option<String>, meta: &ExtractionMetadata) -> Self {
        let predicate = predicate.into();
        let value = value.into();
        let hash = snapshot_hash(&predicate, &value, value_uri.as_deref(), meta);
        Self {
            predicate,
            value,
            value_uri,
            hash,
        }
    }
}

/// The result of comparing candidates against currently-open snapshots for one
/// `(model_uri, predicate)` group: what to close, and what brand-new snapshots
/// to create (§4.7 steps 3-6).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
    pub to_close: Vec<String>,
    pub to_create: Vec<Candidate>,
}

/// Plan the snapshot writes for one `(model_uri, predicate)` group, given the
/// predicate's candidate snapshots this run and the open snapshots already in
/// the store for that predicate (possibly spanning multiple distinct values).
#[must_use]
pub fn plan_predicate_writes(candidates: &[Candidate], open: &[PropertySnapshot]) -> WritePlan {
    let candidate_hashes: std::collections::HashSet<&str> =
        candidates.iter().map(|c| c.hash.as_str()).collect();
    let open_hashes: std::collections::HashSet<&str> = open.iter().map(|s| s.hash.as_str()).collect();

    let to_close = open
        .iter()
        .filter(|s| !candidate_hashes.contains(s.hash.as_str()))
        .map(|s| s.hash.clone())
        .collect();
    let to_create = candidates
        .iter()
        .filter(|c| !open_hashes.contains(c.hash.as_str()))
        .cloned()
        .collect();
    WritePlan { to_close, to_create }
}

/// Storage contract for the temporal metadata subgraph (§6.2-adjacent: this is
/// the Neo4j-backed store in production, but the algorithm above never touches
/// a query language directly).
#[async_trait]
pub trait TemporalStore: Send + Sync {
    /// All currently-open (`valid_to = null`) snapshots for `(model_uri, predicate)`.
    async fn open_snapshots(&self, model_uri: &str, predicate: &str) -> crate::error::Result<Vec<PropertySnapshot>>;

    /// Close the open snapshot identified by `hash` at `valid_to`.
    async fn close_snapshot(&self, model_uri: &str, predicate: &str, hash: &str, valid_to: DateTime<Utc>) -> crate::error::Result<()>;

    /// Create a brand-new open snapshot.
    async fn create_snapshot(&self, model_uri: &str, candidate: &Candidate, valid_from: DateTime<Utc>) -> crate::error::Result<()>;

    /// Every snapshot (open or closed) ever written for `model_uri`, across all
    /// predicates, used for reconstruction.
    async fn all_snapshots(&self, model_uri: &str) -> crate::error::Result<Vec<PropertySnapshot>>;

    /// Every predicate this model has ever had an open snapshot for.
    async fn known_predicates(&self, model_uri: &str) -> crate::error::Result<Vec<String>>;
}

/// `WriteMetadata(model, run_ts)` (§4.7): for every predicate present in
/// `fields`, plan and apply the snapshot writes, then close any predicate that
/// is known for this model but absent from `fields` this run (closure
/// invariant).
pub async fn write_metadata(
    store: &dyn TemporalStore,
    model_uri: &str,
    fields: &BTreeMap<String, Vec<(String, Option<String>, ExtractionMetadata)>>,
    run_ts: DateTime<Utc>,
) -> crate::error::Result<()> {
    let known = store.known_predicates(model_uri).await?;
    for predicate in &known {
        if !fields.contains_key(predicate) {
            for snapshot in store.open_snapshots(model_uri, predicate).await? {
                store.close_snapshot(model_uri, predicate, &snapshot.hash, run_ts).await?;
            }
        }
    }

    for (predicate, values) in fields {
        let candidates: Vec<Candidate> = values
            .iter()
            .map(|(value, value_uri, meta)| Candidate::new(predicate.clone(), value.clone(), value_uri.clone(), meta))
            .collect();
        let open = store.open_snapshots(model_uri, predicate).await?;
        let plan = plan_predicate_writes(&candidates, &open);
        for hash in plan.to_close {
            store.close_snapshot(model_uri, predicate, &hash, run_ts).await?;
        }
        for candidate in plan.to_create {
            store.create_snapshot(model_uri, &candidate, run_ts).await?;
        }
    }
    Ok(())
}

/// Reduce one [`MlModel`] to the `fields` shape [`write_metadata`] expects: one
/// entry per populated predicate, carrying that predicate's extraction metadata
/// (falling back to a `"direct"` default when the record never recorded one,
/// e.g. a list field whose values came from entity linkage rather than a single
/// extracted cell). Mirrors [`crate::rdf::build_mlmodel_triples`]'s predicate
/// list so the temporal graph and the RDF graph never disagree on which fields
/// of a model are tracked (§4.7, §4.6).
#[must_use]
pub fn mlmodel_temporal_fields(
    model: &MlModel,
) -> BTreeMap<String, Vec<(String, Option<String>, ExtractionMetadata)>> {
    let mut fields: BTreeMap<String, Vec<(String, Option<String>, ExtractionMetadata)>> = BTreeMap::new();
    let meta_for = |predicate: &str| {
        model
            .extraction_metadata
            .get(predicate)
            .cloned()
            .unwrap_or_else(|| ExtractionMetadata::direct(predicate))
    };

    let mut scalar = |predicate: &str, value: &Option<String>| {
        if let Some(v) = value {
            let value_uri = is_absolute_iri(v).then(|| v.clone());
            fields.insert(predicate.to_string(), vec![(v.clone(), value_uri, meta_for(predicate))]);
        }
    };
    scalar("name", &model.name);
    scalar("url", &model.url);
    scalar("author", &model.author);
    scalar("sharedBy", &model.shared_by);
    scalar("dateCreated", &model.date_created);
    scalar("dateModified", &model.date_modified);
    scalar("datePublished", &model.date_published);
    scalar("description", &model.description);
    scalar("license", &model.license);
    scalar("modelCategory", &model.model_category);
    scalar("intendedUse", &model.intended_use);
    scalar("readme", &model.readme);

    let mut list = |predicate: &str, values: &[String]| {
        if values.is_empty() {
            return;
        }
        let meta = meta_for(predicate);
        let entries = values
            .iter()
            .map(|v| {
                let value_uri = is_absolute_iri(v).then(|| v.clone());
                (v.clone(), value_uri, meta.clone())
            })
            .collect();
        fields.insert(predicate.to_string(), entries);
    };
    list("keywords", &model.keywords);
    list("inLanguage", &model.in_language);
    list("mlTask", &model.ml_task);
    list("fineTunedFrom", &model.fine_tuned_from);
    list("trainedOn", &model.trained_on);
    list("testedOn", &model.tested_on);
    list("validatedOn", &model.validated_on);
    list("evaluatedOn", &model.evaluated_on);
    list("referencePublication", &model.reference_publication);

    fields
}

/// `Reconstruct(model_uri, t)` (§4.7): values of every snapshot whose validity
/// interval contains `t`, grouped by predicate. Pure over a snapshot list so it
/// can be tested without a live store.
#[must_use]
pub fn reconstruct(snapshots: &[PropertySnapshot], t: DateTime<Utc>) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for s in snapshots {
        let in_range = s.valid_from <= t && s.valid_to.map_or(true, |to| to > t);
        if in_range {
            out.entry(s.predicate.clone()).or_default().push(s.value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(h)
    }

    fn meta() -> ExtractionMetadata {
        ExtractionMetadata::direct("name")
    }

    #[test]
    fn identical_value_produces_matching_hash() {
        let a = Candidate::new("name", "X", None, &meta());
        let b = Candidate::new("name", "X", None, &meta());
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn different_confidence_changes_hash() {
        let mut m2 = meta();
        m2.confidence = 0.5;
        let a = Candidate::new("name", "X", None, &meta());
        let b = Candidate::new("name", "X", None, &m2);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn matching_open_snapshot_is_left_alone() {
        let candidate = Candidate::new("name", "X", None, &meta());
        let open = PropertySnapshot {
            hash: candidate.hash.clone(),
            predicate: "name".to_string(),
            value: "X".to_string(),
            value_uri: None,
            valid_from: ts(0),
            valid_to: None,
        };
        let plan = plan_predicate_writes(&[candidate], &[open]);
        assert!(plan.to_close.is_empty());
        assert!(plan.to_create.is_empty());
    }

    #[test]
    fn changed_value_closes_old_and_creates_new() {
        let old_candidate = Candidate::new("name", "X", None, &meta());
        let open = PropertySnapshot {
            hash: old_candidate.hash.clone(),
            predicate: "name".to_string(),
            value: "X".to_string(),
            value_uri: None,
            valid_from: ts(0),
            valid_to: None,
        };
        let new_candidate = Candidate::new("name", "X-renamed", None, &meta());
        let plan = plan_predicate_writes(&[new_candidate.clone()], &[open]);
        assert_eq!(plan.to_close, vec![old_candidate.hash]);
        assert_eq!(plan.to_create, vec![new_candidate]);
    }

    #[test]
    fn metadata_only_change_still_creates_new_snapshot() {
        let old_candidate = Candidate::new("name", "X", None, &meta());
        let open = PropertySnapshot {
            hash: old_candidate.hash.clone(),
            predicate: "name".to_string(),
            value: "X".to_string(),
            value_uri: None,
            valid_from: ts(0),
            valid_to: None,
        };
        let mut higher_confidence = meta();
        higher_confidence.confidence = 0.95;
        let new_candidate = Candidate::new("name", "X", None, &higher_confidence);
        let plan = plan_predicate_writes(&[new_candidate], &[open]);
        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_close.len(), 1);
    }

    #[test]
    fn reconstruction_is_half_open() {
        let snapshots = vec![PropertySnapshot {
            hash: "h".to_string(),
            predicate: "name".to_string(),
            value: "X".to_string(),
            value_uri: None,
            valid_from: ts(1),
            valid_to: Some(ts(5)),
        }];
        assert!(reconstruct(&snapshots, ts(1)).contains_key("name"));
        assert!(!reconstruct(&snapshots, ts(5)).contains_key("name"));
        assert!(!reconstruct(&snapshots, ts(0)).contains_key("name"));
    }

    #[test]
    fn reconstruction_before_any_snapshot_is_empty() {
        let snapshots = vec![PropertySnapshot {
            hash: "h".to_string(),
            predicate: "name".to_string(),
            value: "X".to_string(),
            value_uri: None,
            valid_from: ts(10),
            valid_to: None,
        }];
        assert!(reconstruct(&snapshots, ts(0)).is_empty());
    }

    #[test]
    fn open_snapshot_has_no_upper_bound() {
        let snapshots = vec![PropertySnapshot {
            hash: "h".to_string(),
            predicate: "name".to_string(),
            value: "X".to_string(),
            value_uri: None,
            valid_from: ts(0),
            valid_to: None,
        }];
        assert!(reconstruct(&snapshots, ts(1_000_000)).contains_key("name"));
    }

    #[test]
    fn mlmodel_fields_include_populated_scalars_and_lists_only() {
        let model = MlModel {
            name: Some("bert-base".to_string()),
            trained_on: vec!["https://w3id.org/mlentory/mlentory_graph/dataset/d1".to_string()],
            ..MlModel::default()
        };
        let fields = mlmodel_temporal_fields(&model);
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("trainedOn"));
        assert!(!fields.contains_key("description"));
        assert!(!fields.contains_key("keywords"));
    }

    #[test]
    fn mlmodel_fields_use_recorded_extraction_metadata_when_present() {
        let mut model = MlModel {
            name: Some("bert-base".to_string()),
            ..MlModel::default()
        };
        model.extraction_metadata.insert("name".to_string(), ExtractionMetadata::direct("modelId"));
        let fields = mlmodel_temporal_fields(&model);
        let (_, _, meta) = &fields["name"][0];
        assert_eq!(meta.source_field.as_deref(), Some("modelId"));
    }

    proptest::proptest! {
        #[test]
        fn rewriting_identical_candidates_never_creates_new_snapshots(value in ".{0,20}") {
            let candidate = Candidate::new("name", value.clone(), None, &meta());
            let open = PropertySnapshot {
                hash: candidate.hash.clone(),
                predicate: "name".to_string(),
                value,
                value_uri: None,
                valid_from: ts(0),
                valid_to: None,
            };
            let plan = plan_predicate_writes(&[candidate], &[open]);
            proptest::prop_assert!(plan.to_create.is_empty());
            proptest::prop_assert!(plan.to_close.is_empty());
        }
    }
}
