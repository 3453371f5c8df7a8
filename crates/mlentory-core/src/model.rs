//! Normalized entity records (§3.1).
//!
//! Each record is IRI-keyed: the field names below are the FAIR4ML predicate names
//! carried on the wire. Unknown predicates a normalizer does not yet model land in
//! `other` rather than being dropped (§9, "dynamic field-keyed records").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a single predicate value was obtained, attached per-field on the owning record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// How the value was produced: `"direct"`, `"api_lookup"`, `"inferred"`, ...
    pub method: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Name of the raw source field this value was mapped from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    /// Free-text notes, e.g. the error that caused a stub.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExtractionMetadata {
    /// Metadata for a value read straight off the source platform's API.
    #[must_use]
    pub fn direct(source_field: impl Into<String>) -> Self {
        Self {
            method: "direct".to_string(),
            confidence: 1.0,
            source_field: Some(source_field.into()),
            notes: None,
        }
    }

    /// Metadata for a value obtained through an enrichment client's external lookup.
    #[must_use]
    pub fn api_lookup(confidence: f64) -> Self {
        Self {
            method: "api_lookup".to_string(),
            confidence,
            source_field: None,
            notes: None,
        }
    }

    /// Metadata for a stub record created after an enrichment failure.
    #[must_use]
    pub fn stub(notes: impl Into<String>) -> Self {
        Self {
            method: "stub".to_string(),
            confidence: 0.0,
            source_field: None,
            notes: Some(notes.into()),
        }
    }
}

/// An ML model, the central entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlModel {
    /// All identifiers for this entity; always includes the MLentory IRI (§3.2).
    pub identifier: Vec<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "sharedBy")]
    pub shared_by: Option<String>,
    #[serde(rename = "dateCreated")]
    pub date_created: Option<String>,
    #[serde(rename = "dateModified")]
    pub date_modified: Option<String>,
    #[serde(rename = "datePublished")]
    pub date_published: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    #[serde(rename = "inLanguage")]
    pub in_language: Vec<String>,
    pub license: Option<String>,
    #[serde(rename = "mlTask")]
    pub ml_task: Vec<String>,
    #[serde(rename = "modelCategory")]
    pub model_category: Option<String>,
    #[serde(rename = "fineTunedFrom")]
    pub fine_tuned_from: Vec<String>,
    #[serde(rename = "intendedUse")]
    pub intended_use: Option<String>,
    #[serde(rename = "usageInstructions")]
    pub usage_instructions: Option<String>,
    #[serde(rename = "codeSampleSnippet")]
    pub code_sample_snippet: Option<String>,
    pub risks: Option<String>,
    pub bias: Option<String>,
    pub limitations: Option<String>,
    #[serde(rename = "ethicalNotes")]
    pub ethical_notes: Option<String>,
    #[serde(rename = "socialNotes")]
    pub social_notes: Option<String>,
    #[serde(rename = "legalNotes")]
    pub legal_notes: Option<String>,
    #[serde(rename = "trainedOn")]
    pub trained_on: Vec<String>,
    #[serde(rename = "testedOn")]
    pub tested_on: Vec<String>,
    #[serde(rename = "validatedOn")]
    pub validated_on: Vec<String>,
    #[serde(rename = "evaluatedOn")]
    pub evaluated_on: Vec<String>,
    #[serde(rename = "referencePublication")]
    pub reference_publication: Vec<String>,
    #[serde(rename = "evaluationMetrics")]
    pub evaluation_metrics: Option<String>,
    #[serde(rename = "discussionUrl")]
    pub discussion_url: Option<String>,
    #[serde(rename = "archivedAt")]
    pub archived_at: Option<String>,
    pub readme: Option<String>,
    #[serde(rename = "issueTracker")]
    pub issue_tracker: Option<String>,
    #[serde(rename = "memoryRequirements")]
    pub memory_requirements: Option<String>,
    #[serde(rename = "CO2e")]
    pub co2e: Option<String>,
    /// Free-form platform-specific counters (downloads, likes, stars, ...).
    pub metrics: HashMap<String, serde_json::Value>,
    /// Predicate name -> how that predicate's value was produced.
    pub extraction_metadata: HashMap<String, ExtractionMetadata>,
    /// Predicates not yet modeled as a typed field.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub other: HashMap<String, serde_json::Value>,
}

impl MlModel {
    /// The MLentory IRI, i.e. the first identifier minted by this codebase
    /// (`https://w3id.org/...`); `None` if the record predates IRI assignment.
    #[must_use]
    pub fn mlentory_iri(&self) -> Option<&str> {
        self.identifier
            .iter()
            .find(|id| id.starts_with("https://w3id.org/mlentory/"))
            .map(String::as_str)
    }
}

/// A paper referenced by a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScholarlyArticle {
    pub identifier: Vec<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "sameAs")]
    pub same_as: Vec<String>,
    pub description: Option<String>,
    pub about: Vec<String>,
    pub author: Vec<String>,
    #[serde(rename = "datePublished")]
    pub date_published: Option<String>,
    #[serde(rename = "dateModified")]
    pub date_modified: Option<String>,
    #[serde(rename = "isPartOf")]
    pub is_part_of: Option<String>,
    pub comment: Option<String>,
    pub extraction_metadata: HashMap<String, ExtractionMetadata>,
}

/// A software/data license, modeled as a `CreativeWork`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreativeWork {
    pub identifier: Vec<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "sameAs")]
    pub same_as: Vec<String>,
    #[serde(rename = "alternateName")]
    pub alternate_name: Vec<String>,
    pub description: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    pub text: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "copyrightNotice")]
    pub copyright_notice: Option<String>,
    #[serde(rename = "legislationJurisdiction")]
    pub legislation_jurisdiction: Option<String>,
    #[serde(rename = "dateCreated")]
    pub date_created: Option<String>,
    pub extraction_metadata: HashMap<String, ExtractionMetadata>,
}

/// A training/evaluation dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub identifier: Vec<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "sameAs")]
    pub same_as: Vec<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    #[serde(rename = "conformsTo")]
    pub conforms_to: Option<String>,
    #[serde(rename = "citeAs")]
    pub cite_as: Option<String>,
    pub keywords: Vec<String>,
    pub creator: Option<String>,
    #[serde(rename = "dateCreated")]
    pub date_created: Option<String>,
    pub extraction_metadata: HashMap<String, ExtractionMetadata>,
}

/// A task or keyword term; the same shape backs both entity kinds (§3.1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinedTerm {
    pub identifier: Vec<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "sameAs")]
    pub same_as: Vec<String>,
    #[serde(rename = "termCode")]
    pub term_code: Option<String>,
    #[serde(rename = "inDefinedTermSet")]
    pub in_defined_term_set: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "alternateName")]
    pub alternate_name: Vec<String>,
    pub extraction_metadata: HashMap<String, ExtractionMetadata>,
}

/// A natural language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub identifier: Vec<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "sameAs")]
    pub same_as: Vec<String>,
    #[serde(rename = "alternateName")]
    pub alternate_name: Vec<String>,
    pub description: Option<String>,
    pub extraction_metadata: HashMap<String, ExtractionMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mlentory_iri_picks_the_w3id_identifier() {
        let model = MlModel {
            identifier: vec![
                "https://huggingface.co/a/b".to_string(),
                "https://w3id.org/mlentory/mlentory_graph/model/abc".to_string(),
            ],
            ..Default::default()
        };
        assert_eq!(
            model.mlentory_iri(),
            Some("https://w3id.org/mlentory/mlentory_graph/model/abc")
        );
    }

    #[test]
    fn mlentory_iri_absent_when_not_minted_yet() {
        let model = MlModel {
            identifier: vec!["https://huggingface.co/a/b".to_string()],
            ..Default::default()
        };
        assert_eq!(model.mlentory_iri(), None);
    }

    #[test]
    fn model_round_trips_through_json() {
        let mut model = MlModel {
            name: Some("bert-base".to_string()),
            trained_on: vec!["https://example.com/d1".to_string()],
            ..Default::default()
        };
        model
            .extraction_metadata
            .insert("name".to_string(), ExtractionMetadata::direct("modelId"));
        let json = serde_json::to_string(&model).unwrap();
        let back: MlModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
