//! RDF triple building and a fallback Turtle serializer (§4.6, §9).

use crate::iri::{is_absolute_iri, mint_fallback_iri, EntityKind};
use crate::model::{CreativeWork, Dataset, DefinedTerm, Language, MlModel, ScholarlyArticle};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// The object side of a triple: either an IRI reference or a typed literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Iri(String),
    Literal { value: String, datatype: &'static str },
}

impl Object {
    #[must_use]
    pub fn string_literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: "xsd:string",
        }
    }

    #[must_use]
    pub fn datetime_literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: normalize_datetime(&value.into()),
            datatype: "xsd:dateTime",
        }
    }
}

/// A single RDF triple: `(IRI, IRI, IRI)` or `(IRI, IRI, typed-literal)` (§4.6
/// invariant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
}

const NS_RDF: &str = "rdf:type";
const NS_FAIR4ML: &str = "fair4ml";
const NS_SCHEMA: &str = "schema";

fn class_for_kind(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::MlModel => "fair4ml:MLModel",
        EntityKind::Article => "schema:ScholarlyArticle",
        EntityKind::License => "schema:CreativeWork",
        EntityKind::Dataset => "schema:Dataset",
        EntityKind::Term => "schema:DefinedTerm",
        EntityKind::Language => "schema:Language",
    }
}

/// Datetime predicates get `xsd:dateTime` objects instead of `xsd:string`.
const TEMPORAL_PREDICATES: &[&str] = &[
    "dateCreated",
    "dateModified",
    "datePublished",
    "archivedAt",
];

/// Normalize `Z` suffix to `+00:00`, widen date-only input to midnight, and pass
/// through integer epoch seconds as local ISO (§4.6 invariants).
#[must_use]
pub fn normalize_datetime(value: &str) -> String {
    if let Ok(epoch) = value.parse::<i64>() {
        if let Some(dt) = chrono::DateTime::from_timestamp(epoch, 0) {
            return dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string();
        }
    }
    let widened = if value.len() == 10 && value.chars().nth(4) == Some('-') {
        format!("{value}T00:00:00")
    } else {
        value.to_string()
    };
    if let Some(stripped) = widened.strip_suffix('Z') {
        format!("{stripped}+00:00")
    } else {
        widened
    }
}

/// Choose the subject IRI for a record's identifier list: prefer the MLentory
/// IRI, else any syntactically valid absolute IRI, else a hash-derived fallback
/// (§4.6 `BuildTriples`).
#[must_use]
pub fn choose_subject(kind: EntityKind, identifiers: &[String]) -> String {
    if let Some(mlentory) = identifiers.iter().find(|id| id.starts_with("https://w3id.org/mlentory/")) {
        return mlentory.clone();
    }
    if let Some(valid) = identifiers.iter().find(|id| is_absolute_iri(id)) {
        return valid.clone();
    }
    mint_fallback_iri(kind, identifiers)
}

/// Build the triple set for one [`MlModel`] (§4.6 `BuildTriples`). Returns the
/// full triple set for this subject — repeated calls for the same subject
/// overwrite rather than append at the store layer (§4.6 idempotence invariant;
/// enforced by [`crate::rdf::RdfGraph::replace_subject`]).
#[must_use]
pub fn build_mlmodel_triples(model: &MlModel) -> Vec<Triple> {
    let subject = choose_subject(EntityKind::MlModel, &model.identifier);
    let mut triples = vec![Triple {
        subject: subject.clone(),
        predicate: NS_RDF.to_string(),
        object: Object::Iri(class_for_kind(EntityKind::MlModel).to_string()),
    }];

    let mut literal = |predicate: &str, value: &Option<String>| {
        if let Some(v) = value {
            let object = if TEMPORAL_PREDICATES.contains(&predicate) {
                Object::datetime_literal(v.clone())
            } else if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_FAIR4ML}:{predicate}"),
                object,
            });
        }
    };
    literal("name", &model.name);
    literal("url", &model.url);
    literal("author", &model.author);
    literal("sharedBy", &model.shared_by);
    literal("dateCreated", &model.date_created);
    literal("dateModified", &model.date_modified);
    literal("datePublished", &model.date_published);
    literal("description", &model.description);
    literal("license", &model.license);
    literal("modelCategory", &model.model_category);
    literal("intendedUse", &model.intended_use);
    literal("readme", &model.readme);

    let mut list = |predicate: &str, values: &[String]| {
        for v in values {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_FAIR4ML}:{predicate}"),
                object,
            });
        }
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

    triples
}

/// Build the triple set for one [`ScholarlyArticle`] (§4.6 `BuildTriples`).
#[must_use]
pub fn build_article_triples(article: &ScholarlyArticle) -> Vec<Triple> {
    let subject = choose_subject(EntityKind::Article, &article.identifier);
    let mut triples = vec![Triple {
        subject: subject.clone(),
        predicate: NS_RDF.to_string(),
        object: Object::Iri(class_for_kind(EntityKind::Article).to_string()),
    }];

    let mut literal = |predicate: &str, value: &Option<String>| {
        if let Some(v) = value {
            let object = if TEMPORAL_PREDICATES.contains(&predicate) {
                Object::datetime_literal(v.clone())
            } else if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    literal("name", &article.name);
    literal("url", &article.url);
    literal("description", &article.description);
    literal("isPartOf", &article.is_part_of);
    literal("comment", &article.comment);
    literal("datePublished", &article.date_published);
    literal("dateModified", &article.date_modified);

    let mut list = |predicate: &str, values: &[String]| {
        for v in values {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    list("sameAs", &article.same_as);
    list("about", &article.about);
    list("author", &article.author);

    triples
}

/// Build the triple set for one [`CreativeWork`] (a license; §4.6 `BuildTriples`).
#[must_use]
pub fn build_license_triples(license: &CreativeWork) -> Vec<Triple> {
    let subject = choose_subject(EntityKind::License, &license.identifier);
    let mut triples = vec![Triple {
        subject: subject.clone(),
        predicate: NS_RDF.to_string(),
        object: Object::Iri(class_for_kind(EntityKind::License).to_string()),
    }];

    let mut literal = |predicate: &str, value: &Option<String>| {
        if let Some(v) = value {
            let object = if TEMPORAL_PREDICATES.contains(&predicate) {
                Object::datetime_literal(v.clone())
            } else if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    literal("name", &license.name);
    literal("url", &license.url);
    literal("description", &license.description);
    literal("abstract", &license.abstract_);
    literal("text", &license.text);
    literal("version", &license.version);
    literal("copyrightNotice", &license.copyright_notice);
    literal("legislationJurisdiction", &license.legislation_jurisdiction);
    literal("dateCreated", &license.date_created);

    let mut list = |predicate: &str, values: &[String]| {
        for v in values {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    list("sameAs", &license.same_as);
    list("alternateName", &license.alternate_name);

    triples
}

/// Build the triple set for one [`Dataset`] (§4.6 `BuildTriples`).
#[must_use]
pub fn build_dataset_triples(dataset: &Dataset) -> Vec<Triple> {
    let subject = choose_subject(EntityKind::Dataset, &dataset.identifier);
    let mut triples = vec![Triple {
        subject: subject.clone(),
        predicate: NS_RDF.to_string(),
        object: Object::Iri(class_for_kind(EntityKind::Dataset).to_string()),
    }];

    let mut literal = |predicate: &str, value: &Option<String>| {
        if let Some(v) = value {
            let object = if TEMPORAL_PREDICATES.contains(&predicate) {
                Object::datetime_literal(v.clone())
            } else if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    literal("name", &dataset.name);
    literal("url", &dataset.url);
    literal("description", &dataset.description);
    literal("license", &dataset.license);
    literal("conformsTo", &dataset.conforms_to);
    literal("citeAs", &dataset.cite_as);
    literal("creator", &dataset.creator);
    literal("dateCreated", &dataset.date_created);

    let mut list = |predicate: &str, values: &[String]| {
        for v in values {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    list("sameAs", &dataset.same_as);
    list("keywords", &dataset.keywords);

    triples
}

/// Build the triple set for one [`DefinedTerm`] (a task or keyword; §4.6 `BuildTriples`).
#[must_use]
pub fn build_term_triples(term: &DefinedTerm) -> Vec<Triple> {
    let subject = choose_subject(EntityKind::Term, &term.identifier);
    let mut triples = vec![Triple {
        subject: subject.clone(),
        predicate: NS_RDF.to_string(),
        object: Object::Iri(class_for_kind(EntityKind::Term).to_string()),
    }];

    let mut literal = |predicate: &str, value: &Option<String>| {
        if let Some(v) = value {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    literal("name", &term.name);
    literal("url", &term.url);
    literal("termCode", &term.term_code);
    literal("inDefinedTermSet", &term.in_defined_term_set);
    literal("description", &term.description);

    let mut list = |predicate: &str, values: &[String]| {
        for v in values {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    list("sameAs", &term.same_as);
    list("alternateName", &term.alternate_name);

    triples
}

/// Build the triple set for one [`Language`] (§4.6 `BuildTriples`).
#[must_use]
pub fn build_language_triples(language: &Language) -> Vec<Triple> {
    let subject = choose_subject(EntityKind::Language, &language.identifier);
    let mut triples = vec![Triple {
        subject: subject.clone(),
        predicate: NS_RDF.to_string(),
        object: Object::Iri(class_for_kind(EntityKind::Language).to_string()),
    }];

    let mut literal = |predicate: &str, value: &Option<String>| {
        if let Some(v) = value {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    literal("name", &language.name);
    literal("url", &language.url);
    literal("description", &language.description);

    let mut list = |predicate: &str, values: &[String]| {
        for v in values {
            let object = if is_absolute_iri(v) {
                Object::Iri(v.clone())
            } else {
                Object::string_literal(v.clone())
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: format!("{NS_SCHEMA}:{predicate}"),
                object,
            });
        }
    };
    list("sameAs", &language.same_as);
    list("alternateName", &language.alternate_name);

    triples
}

/// An in-memory batch of triples grouped by subject, supporting the
/// subject-overwrite idempotence the spec requires, plus a Turtle fallback
/// serializer for when the triple store's native exporter is unavailable (§9).
#[derive(Debug, Default)]
pub struct RdfGraph {
    by_subject: BTreeMap<String, Vec<Triple>>,
}

impl RdfGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all triples for `subject` with `triples` (idempotent write).
    pub fn replace_subject(&mut self, subject: &str, triples: Vec<Triple>) {
        self.by_subject.insert(subject.to_string(), triples);
    }

    #[must_use]
    pub fn triple_count(&self) -> usize {
        self.by_subject.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn subjects(&self) -> Vec<&str> {
        self.by_subject.keys().map(String::as_str).collect()
    }

    /// Serialize the triples for `subjects` (or every subject, if empty) to
    /// Turtle, one subject block per entity, restricted to subjects written in
    /// the current batch (§4.6 `PersistAndExport`).
    #[must_use]
    pub fn to_turtle(&self, subjects: &[String]) -> String {
        let mut out = String::new();
        out.push_str("@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .\n");
        out.push_str("@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n");
        out.push_str("@prefix schema: <https://schema.org/> .\n");
        out.push_str("@prefix fair4ml: <https://fair4ml.github.io/schema/> .\n\n");

        let selected: Vec<&String> = if subjects.is_empty() {
            self.by_subject.keys().collect()
        } else {
            subjects.iter().filter(|s| self.by_subject.contains_key(*s)).collect()
        };

        for subject in selected {
            let Some(triples) = self.by_subject.get(subject) else {
                continue;
            };
            let _ = writeln!(out, "<{subject}>");
            for (i, t) in triples.iter().enumerate() {
                let sep = if i + 1 == triples.len() { "." } else { ";" };
                let predicate = if t.predicate == NS_RDF {
                    "rdf:type".to_string()
                } else {
                    t.predicate.clone()
                };
                match &t.object {
                    Object::Iri(iri) => {
                        let _ = writeln!(out, "    {predicate} <{iri}> {sep}");
                    }
                    Object::Literal { value, datatype } => {
                        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                        let _ = writeln!(out, "    {predicate} \"{escaped}\"^^{datatype} {sep}");
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_normalization_widens_date_only() {
        assert_eq!(normalize_datetime("2024-01-05"), "2024-01-05T00:00:00");
    }

    #[test]
    fn datetime_normalization_converts_z_suffix() {
        assert_eq!(normalize_datetime("2024-01-05T10:00:00Z"), "2024-01-05T10:00:00+00:00");
    }

    #[test]
    fn datetime_normalization_passes_through_epoch_seconds() {
        let normalized = normalize_datetime("1700000000");
        assert!(normalized.starts_with("2023-11-14"));
    }

    #[test]
    fn subject_prefers_mlentory_iri() {
        let ids = vec![
            "https://huggingface.co/a/b".to_string(),
            "https://w3id.org/mlentory/mlentory_graph/model/abc".to_string(),
        ];
        assert_eq!(
            choose_subject(EntityKind::MlModel, &ids),
            "https://w3id.org/mlentory/mlentory_graph/model/abc"
        );
    }

    #[test]
    fn subject_falls_back_to_any_valid_iri_then_hash() {
        let ids = vec!["https://huggingface.co/a/b".to_string()];
        assert_eq!(choose_subject(EntityKind::MlModel, &ids), ids[0]);

        let malformed = vec!["not a uri".to_string()];
        let subject = choose_subject(EntityKind::MlModel, &malformed);
        assert!(subject.starts_with("https://w3id.org/mlentory/mlentory_graph/model/"));
    }

    #[test]
    fn build_triples_emits_type_triple_and_list_predicates() {
        let model = MlModel {
            identifier: vec!["https://w3id.org/mlentory/mlentory_graph/model/abc".to_string()],
            name: Some("bert".to_string()),
            trained_on: vec!["https://w3id.org/mlentory/mlentory_graph/dataset/d1".to_string()],
            ..Default::default()
        };
        let triples = build_mlmodel_triples(&model);
        assert!(triples
            .iter()
            .any(|t| t.predicate == NS_RDF && t.object == Object::Iri("fair4ml:MLModel".to_string())));
        assert!(triples.iter().any(|t| t.predicate == "fair4ml:trainedOn"));
    }

    #[test]
    fn article_triples_emit_type_and_list_predicates() {
        let article = ScholarlyArticle {
            identifier: vec!["https://w3id.org/mlentory/mlentory_graph/article/abc".to_string()],
            name: Some("LoRA".to_string()),
            author: vec!["Edward Hu".to_string()],
            ..Default::default()
        };
        let triples = build_article_triples(&article);
        assert!(triples
            .iter()
            .any(|t| t.predicate == NS_RDF && t.object == Object::Iri("schema:ScholarlyArticle".to_string())));
        assert!(triples.iter().any(|t| t.predicate == "schema:author"));
    }

    #[test]
    fn license_triples_use_abstract_and_version_predicates() {
        let license = CreativeWork {
            identifier: vec!["https://w3id.org/mlentory/mlentory_graph/license/abc".to_string()],
            name: Some("MIT License".to_string()),
            version: Some("1.0".to_string()),
            ..Default::default()
        };
        let triples = build_license_triples(&license);
        assert!(triples.iter().any(|t| t.predicate == "schema:version"));
    }

    #[test]
    fn dataset_triples_emit_keywords_list() {
        let dataset = Dataset {
            identifier: vec!["https://w3id.org/mlentory/mlentory_graph/dataset/abc".to_string()],
            keywords: vec!["nlp".to_string()],
            ..Default::default()
        };
        let triples = build_dataset_triples(&dataset);
        assert!(triples.iter().any(|t| t.predicate == "schema:keywords"));
    }

    #[test]
    fn term_and_language_triples_emit_their_type() {
        let term = DefinedTerm {
            identifier: vec!["https://w3id.org/mlentory/mlentory_graph/term/abc".to_string()],
            ..Default::default()
        };
        assert!(build_term_triples(&term)
            .iter()
            .any(|t| t.object == Object::Iri("schema:DefinedTerm".to_string())));

        let language = Language {
            identifier: vec!["https://w3id.org/mlentory/mlentory_graph/language/abc".to_string()],
            ..Default::default()
        };
        assert!(build_language_triples(&language)
            .iter()
            .any(|t| t.object == Object::Iri("schema:Language".to_string())));
    }

    #[test]
    fn repeated_write_overwrites_rather_than_appends() {
        let mut graph = RdfGraph::new();
        graph.replace_subject(
            "s1",
            vec![Triple {
                subject: "s1".to_string(),
                predicate: "fair4ml:name".to_string(),
                object: Object::string_literal("old"),
            }],
        );
        graph.replace_subject(
            "s1",
            vec![Triple {
                subject: "s1".to_string(),
                predicate: "fair4ml:name".to_string(),
                object: Object::string_literal("new"),
            }],
        );
        assert_eq!(graph.triple_count(), 1);
    }

    #[test]
    fn turtle_export_restricted_to_given_subjects() {
        let mut graph = RdfGraph::new();
        graph.replace_subject(
            "s1",
            vec![Triple {
                subject: "s1".to_string(),
                predicate: "fair4ml:name".to_string(),
                object: Object::string_literal("a"),
            }],
        );
        graph.replace_subject(
            "s2",
            vec![Triple {
                subject: "s2".to_string(),
                predicate: "fair4ml:name".to_string(),
                object: Object::string_literal("b"),
            }],
        );
        let turtle = graph.to_turtle(&["s1".to_string()]);
        assert!(turtle.contains("<s1>"));
        assert!(!turtle.contains("<s2>"));
    }
}
