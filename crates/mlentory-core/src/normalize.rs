//! Normalizers (§4.5): raw → FAIR schema, with validation and entity linkage.

use crate::iri::{mint_iri, EntityKind};
use crate::model::MlModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A per-record validation failure, appended to `<kind>_transformation_errors.json`
/// rather than aborting the stage (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub record_id: String,
    pub message: String,
    pub raw: serde_json::Value,
}

/// The entity-linkage map produced by per-record identification (§4.5): for one
/// model record, the resolved MLentory IRIs its references should become.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityLinkage {
    pub datasets: Vec<String>,
    pub articles: Vec<String>,
    pub base_models: Vec<String>,
    pub keywords: Vec<String>,
    pub license: Option<String>,
    pub languages: Vec<String>,
    pub tasks: Vec<String>,
}

impl EntityLinkage {
    /// Build linkage from raw foreign ids, minting an MLentory IRI for each via
    /// the same hash function used everywhere else (§4.5 "All right-hand values
    /// are MLentory IRIs minted by the same hash function as above").
    #[must_use]
    pub fn from_raw_ids(
        platform: &str,
        dataset_ids: &[String],
        article_ids: &[String],
        base_model_ids: &[String],
        keyword_ids: &[String],
        license_ids: &[String],
        language_ids: &[String],
        task_ids: &[String],
    ) -> Self {
        let mint = |kind: EntityKind, ids: &[String]| -> Vec<String> {
            ids.iter().map(|id| mint_iri(kind, platform, id)).collect()
        };
        Self {
            datasets: mint(EntityKind::Dataset, dataset_ids),
            articles: mint(EntityKind::Article, article_ids),
            base_models: mint(EntityKind::MlModel, base_model_ids),
            keywords: mint(EntityKind::Term, keyword_ids),
            // "single-valued, first wins" (§4.5 entity linkage table).
            license: license_ids.first().map(|id| mint_iri(EntityKind::License, platform, id)),
            languages: mint(EntityKind::Language, language_ids),
            tasks: mint(EntityKind::Term, task_ids),
        }
    }

    /// Apply this linkage onto a partially-built model (§4.5 `Merge`).
    ///
    /// `trainedOn`/`testedOn`/`validatedOn`/`evaluatedOn` are all populated from
    /// the dataset linkage when the source platform does not distinguish dataset
    /// roles, per the entity linkage table.
    pub fn merge_into(&self, model: &mut MlModel) {
        model.trained_on = self.datasets.clone();
        model.tested_on = self.datasets.clone();
        model.validated_on = self.datasets.clone();
        model.evaluated_on = self.datasets.clone();
        model.reference_publication = self.articles.clone();
        model.fine_tuned_from = self.base_models.clone();
        model.keywords = self.keywords.clone();
        model.license = self.license.clone();
        model.in_language = self.languages.clone();
        model.ml_task = self.tasks.clone();
    }
}

/// Validate a model record against the schema invariants (§3.2, §4.5).
///
/// Does not mutate the record; callers route failures to the errors artifact
/// and exclude the record from downstream stages.
pub fn validate_mlmodel(model: &MlModel) -> Result<(), ValidationError> {
    let record_id = model
        .identifier
        .first()
        .cloned()
        .unwrap_or_else(|| "<unknown>".to_string());

    if model.identifier.is_empty() {
        return Err(ValidationError {
            record_id,
            message: "identifier list must not be empty".to_string(),
            raw: serde_json::to_value(model).unwrap_or(serde_json::Value::Null),
        });
    }
    if !model.identifier.iter().any(|id| id.starts_with("https://w3id.org/mlentory/")) {
        return Err(ValidationError {
            record_id,
            message: "identifier list must contain the MLentory IRI".to_string(),
            raw: serde_json::to_value(model).unwrap_or(serde_json::Value::Null),
        });
    }
    for (field, value) in [("license", &model.license)] {
        if let Some(v) = value {
            if !crate::iri::is_absolute_iri(v) {
                return Err(ValidationError {
                    record_id,
                    message: format!("{field} is not a syntactically valid absolute IRI: {v}"),
                    raw: serde_json::to_value(model).unwrap_or(serde_json::Value::Null),
                });
            }
        }
    }
    let extraction_keys: std::collections::HashSet<&str> =
        model.extraction_metadata.keys().map(String::as_str).collect();
    let own_predicate_keys: std::collections::HashSet<&str> = own_predicate_names();
    if !extraction_keys.is_subset(&own_predicate_keys) {
        return Err(ValidationError {
            record_id,
            message: "extraction_metadata has keys outside the record's own predicates".to_string(),
            raw: serde_json::to_value(model).unwrap_or(serde_json::Value::Null),
        });
    }
    Ok(())
}

fn own_predicate_names() -> std::collections::HashSet<&'static str> {
    [
        "name", "url", "author", "sharedBy", "dateCreated", "dateModified", "datePublished",
        "description", "keywords", "inLanguage", "license", "mlTask", "modelCategory",
        "fineTunedFrom", "intendedUse", "usageInstructions", "codeSampleSnippet", "risks",
        "bias", "limitations", "ethicalNotes", "socialNotes", "legalNotes", "trainedOn",
        "testedOn", "validatedOn", "evaluatedOn", "referencePublication", "evaluationMetrics",
        "discussionUrl", "archivedAt", "readme", "issueTracker", "memoryRequirements", "CO2e",
    ]
    .into_iter()
    .collect()
}

/// Validate a batch, splitting into survivors and per-record errors; the stage
/// only fails with `EmptyOutput` when every record fails (§7).
pub fn validate_batch(models: Vec<MlModel>) -> (Vec<MlModel>, Vec<ValidationError>) {
    let mut ok = Vec::new();
    let mut errors = Vec::new();
    for model in models {
        match validate_mlmodel(&model) {
            Ok(()) => ok.push(model),
            Err(e) => errors.push(e),
        }
    }
    (ok, errors)
}

/// Build the URI -> display-name translation map the document indexer needs
/// (§4.8 `translation_map`, GLOSSARY "Translation map"): every MLentory IRI that
/// appeared anywhere in the run, mapped to its best available display name.
#[must_use]
pub fn build_translation_map(
    models: &[MlModel],
    names_by_iri: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut map = names_by_iri.clone();
    for model in models {
        if let (Some(iri), Some(name)) = (model.mlentory_iri(), &model.name) {
            map.entry(iri.to_string()).or_insert_with(|| name.clone());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_model() -> MlModel {
        MlModel {
            identifier: vec![
                "https://w3id.org/mlentory/mlentory_graph/model/abc".to_string(),
                "https://huggingface.co/a/b".to_string(),
            ],
            name: Some("a/b".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_model_passes() {
        assert!(validate_mlmodel(&valid_model()).is_ok());
    }

    #[test]
    fn missing_mlentory_iri_fails_validation() {
        let mut m = valid_model();
        m.identifier = vec!["https://huggingface.co/a/b".to_string()];
        let err = validate_mlmodel(&m).unwrap_err();
        assert!(err.message.contains("MLentory IRI"));
    }

    #[test]
    fn empty_identifier_list_fails_validation() {
        let mut m = valid_model();
        m.identifier.clear();
        assert!(validate_mlmodel(&m).is_err());
    }

    #[test]
    fn malformed_license_iri_fails_validation() {
        let mut m = valid_model();
        m.license = Some("not-a-uri".to_string());
        assert!(validate_mlmodel(&m).is_err());
    }

    #[test]
    fn extraction_metadata_keys_must_be_subset_of_own_predicates() {
        let mut m = valid_model();
        m.extraction_metadata.insert(
            "totallyUnknownField".to_string(),
            crate::model::ExtractionMetadata::direct("x"),
        );
        assert!(validate_mlmodel(&m).is_err());
    }

    #[test]
    fn validate_batch_excludes_only_failing_records() {
        let good = valid_model();
        let mut bad = valid_model();
        bad.identifier.clear();
        let (ok, errors) = validate_batch(vec![good, bad]);
        assert_eq!(ok.len(), 1);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn linkage_populates_all_four_dataset_roles() {
        let linkage = EntityLinkage::from_raw_ids(
            "huggingface",
            &["d1".to_string()],
            &[],
            &[],
            &[],
            &[],
            &[],
            &[],
        );
        let mut model = MlModel::default();
        linkage.merge_into(&mut model);
        assert_eq!(model.trained_on, model.tested_on);
        assert_eq!(model.trained_on, model.validated_on);
        assert_eq!(model.trained_on, model.evaluated_on);
        assert_eq!(model.trained_on.len(), 1);
    }

    #[test]
    fn license_linkage_keeps_only_first_id() {
        let linkage = EntityLinkage::from_raw_ids(
            "huggingface",
            &[],
            &[],
            &[],
            &[],
            &["mit".to_string(), "apache-2.0".to_string()],
            &[],
            &[],
        );
        let expected = mint_iri(EntityKind::License, "huggingface", "mit");
        assert_eq!(linkage.license, Some(expected));
    }

    #[test]
    fn translation_map_prefers_explicit_names_but_fills_gaps_from_models() {
        let mut model = valid_model();
        model.name = Some("display-name".to_string());
        let map = build_translation_map(&[model], &BTreeMap::new());
        assert_eq!(
            map.get("https://w3id.org/mlentory/mlentory_graph/model/abc"),
            Some(&"display-name".to_string())
        );
    }
}
