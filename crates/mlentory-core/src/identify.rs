//! Entity identifiers (§4.3): inspect raw records, produce reference sets per
//! entity kind.
//!
//! The signal table is platform-agnostic: every source extractor normalizes its
//! primary records down to a [`RawRecord`] (tags + free-text card + a bag of
//! platform-specific fields) before running identification, so `huggingface`'s
//! tag-based signals and `openml`'s field-based signals share one implementation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// A source record reduced to the shape identifiers operate on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// The platform-native primary id, e.g. `"bert-base-uncased"` or `"a/b"`.
    pub id: String,
    /// Tags in `prefix:value` form (`dataset:`, `arxiv:`, `base_model:`, `license:`)
    /// plus free keywords, as produced by tag-based platforms.
    pub tags: Vec<String>,
    /// The model card / README / manifest free text, scanned for arXiv ids.
    pub card_text: String,
    /// The `pipeline_tag`-equivalent primary task label, if the platform has one.
    pub pipeline_tag: Option<String>,
    /// Library/framework name (counted as a keyword signal).
    pub library_name: Option<String>,
    /// Field-based references for platforms that don't use prefixed tags
    /// (OpenML's `dataset_id`/`flow_id` style fields), keyed by the same
    /// reserved prefixes as `tags` (`"dataset"`, `"arxiv"`, `"base_model"`,
    /// `"license"`).
    pub fields: BTreeMap<String, Vec<String>>,
}

const RESERVED_PREFIXES: &[&str] = &["dataset", "arxiv", "base_model", "license"];

fn arxiv_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}\.\d{4,5}(v\d+)?").expect("static regex is valid"))
}

fn iso639_codes() -> &'static BTreeSet<&'static str> {
    static CODES: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    CODES.get_or_init(|| {
        [
            "en", "fr", "de", "es", "it", "pt", "nl", "ru", "zh", "ja", "ko", "ar", "hi", "bn",
            "pa", "sv", "pl", "tr", "vi", "th", "fa", "he", "el", "cs", "fi", "da", "no", "hu",
            "ro", "uk",
        ]
        .into_iter()
        .collect()
    })
}

fn tag_value<'a>(tag: &'a str, prefix: &str) -> Option<&'a str> {
    tag.strip_prefix(prefix).and_then(|rest| rest.strip_prefix(':'))
}

fn per_record_for_prefix(record: &RawRecord, prefix: &str) -> Vec<String> {
    let mut refs: Vec<String> = record
        .tags
        .iter()
        .filter_map(|t| tag_value(t, prefix))
        .map(str::to_string)
        .collect();
    if let Some(field_refs) = record.fields.get(prefix) {
        refs.extend(field_refs.iter().cloned());
    }
    if prefix == "dataset" {
        refs.extend(record.fields.get("trainedOn").cloned().unwrap_or_default());
    }
    refs.sort();
    refs.dedup();
    refs
}

/// Reference sets and per-record maps for the datasets entity kind.
#[must_use]
pub fn identify_datasets_per_record(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .map(|r| (r.id.clone(), per_record_for_prefix(r, "dataset")))
        .collect()
}

/// Aggregate dataset references across all records.
#[must_use]
pub fn identify_datasets(records: &[RawRecord]) -> BTreeSet<String> {
    records.iter().flat_map(|r| per_record_for_prefix(r, "dataset")).collect()
}

/// Per-record article (arXiv) references: tag-prefixed plus ids found via regex
/// scan of the card text.
#[must_use]
pub fn identify_articles_per_record(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .map(|r| {
            let mut refs = per_record_for_prefix(r, "arxiv");
            for m in arxiv_id_regex().find_iter(&r.card_text) {
                refs.push(m.as_str().to_string());
            }
            refs.sort();
            refs.dedup();
            (r.id.clone(), refs)
        })
        .collect()
}

/// Aggregate arXiv references across all records.
#[must_use]
pub fn identify_articles(records: &[RawRecord]) -> BTreeSet<String> {
    identify_articles_per_record(records).into_values().flatten().collect()
}

/// Per-record base-model references.
#[must_use]
pub fn identify_base_models_per_record(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .map(|r| (r.id.clone(), per_record_for_prefix(r, "base_model")))
        .collect()
}

/// Aggregate base-model references across all records.
#[must_use]
pub fn identify_base_models(records: &[RawRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|r| per_record_for_prefix(r, "base_model"))
        .collect()
}

/// Per-record license references (first tag/field wins downstream; here we keep
/// every candidate so normalization can apply the "first wins" rule).
#[must_use]
pub fn identify_licenses_per_record(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .map(|r| (r.id.clone(), per_record_for_prefix(r, "license")))
        .collect()
}

/// Aggregate license references across all records.
#[must_use]
pub fn identify_licenses(records: &[RawRecord]) -> BTreeSet<String> {
    records.iter().flat_map(|r| per_record_for_prefix(r, "license")).collect()
}

/// Per-record language references: tags that validate as ISO-639 codes.
#[must_use]
pub fn identify_languages_per_record(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .map(|r| {
            let refs: Vec<String> = r
                .tags
                .iter()
                .filter(|t| iso639_codes().contains(t.as_str()))
                .cloned()
                .collect();
            (r.id.clone(), refs)
        })
        .collect()
}

/// Aggregate language references across all records.
#[must_use]
pub fn identify_languages(records: &[RawRecord]) -> BTreeSet<String> {
    identify_languages_per_record(records).into_values().flatten().collect()
}

/// Per-record task references: pipeline tag plus any tags normalized via the
/// known-task catalog.
#[must_use]
pub fn identify_tasks_per_record(
    records: &[RawRecord],
    known_tasks: &BTreeSet<String>,
) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .map(|r| {
            let mut refs: Vec<String> = Vec::new();
            if let Some(tag) = &r.pipeline_tag {
                if known_tasks.contains(tag) {
                    refs.push(tag.clone());
                }
            }
            refs.extend(r.tags.iter().filter(|t| known_tasks.contains(*t)).cloned());
            refs.sort();
            refs.dedup();
            (r.id.clone(), refs)
        })
        .collect()
}

/// Aggregate task references across all records.
#[must_use]
pub fn identify_tasks(records: &[RawRecord], known_tasks: &BTreeSet<String>) -> BTreeSet<String> {
    identify_tasks_per_record(records, known_tasks)
        .into_values()
        .flatten()
        .collect()
}

/// Per-record keyword references: every tag that isn't a reserved prefix or an
/// ISO-639 code, plus the pipeline tag and library name, length-filtered to at
/// most 4 whitespace tokens.
#[must_use]
pub fn identify_keywords_per_record(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .map(|r| {
            let mut candidates: Vec<String> = r
                .tags
                .iter()
                .filter(|t| {
                    !RESERVED_PREFIXES.iter().any(|p| t.starts_with(&format!("{p}:")))
                        && !iso639_codes().contains(t.as_str())
                })
                .cloned()
                .collect();
            if let Some(tag) = &r.pipeline_tag {
                candidates.push(tag.clone());
            }
            if let Some(lib) = &r.library_name {
                candidates.push(lib.clone());
            }
            candidates.retain(|c| c.split_whitespace().count() <= 4 && !c.is_empty());
            candidates.sort();
            candidates.dedup();
            (r.id.clone(), candidates)
        })
        .collect()
}

/// Aggregate keyword references across all records.
#[must_use]
pub fn identify_keywords(records: &[RawRecord]) -> BTreeSet<String> {
    identify_keywords_per_record(records).into_values().flatten().collect()
}

/// Drive the base-model iterative enrichment loop (§4.3): each iteration
/// identifies base-model references in `records`, diffs against `seen`, and
/// yields only the newly discovered ids. Termination is the caller's
/// responsibility (no new ids, or the iteration cap), mirroring the spec's
/// "feeds back into the extractor" description rather than owning fetch I/O here.
pub fn next_base_model_delta(records: &[RawRecord], seen: &mut BTreeSet<String>) -> BTreeSet<String> {
    let current = identify_base_models(records);
    let delta: BTreeSet<String> = current.difference(seen).cloned().collect();
    seen.extend(delta.iter().cloned());
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, tags: &[&str], card: &str) -> RawRecord {
        RawRecord {
            id: id.to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            card_text: card.to_string(),
            pipeline_tag: None,
            library_name: None,
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn identifies_dataset_tags() {
        let r = record("m1", &["dataset:d1", "license:mit"], "");
        let refs = identify_datasets(&[r]);
        assert_eq!(refs, BTreeSet::from(["d1".to_string()]));
    }

    #[test]
    fn identifies_arxiv_id_from_tag_and_card_text() {
        let r = record("m1", &["arxiv:2106.09685"], "see https://arxiv.org/abs/1706.03762 too");
        let refs = identify_articles(&[r]);
        assert_eq!(
            refs,
            BTreeSet::from(["2106.09685".to_string(), "1706.03762".to_string()])
        );
    }

    #[test]
    fn arxiv_regex_matches_versioned_ids() {
        let r = record("m1", &[], "1706.03762v5");
        let refs = identify_articles(&[r]);
        assert_eq!(refs, BTreeSet::from(["1706.03762v5".to_string()]));
    }

    #[test]
    fn identifies_base_model_tags() {
        let r = record("m2", &["base_model:m1"], "");
        assert_eq!(identify_base_models(&[r]), BTreeSet::from(["m1".to_string()]));
    }

    #[test]
    fn keywords_exclude_reserved_prefixes_and_languages() {
        let r = record(
            "m1",
            &["dataset:d1", "arxiv:123", "license:mit", "en", "text-generation", "a b c d e"],
            "",
        );
        let refs = identify_keywords(&[r]);
        assert!(refs.contains("text-generation"));
        assert!(!refs.contains("d1"));
        assert!(!refs.contains("en"));
        assert!(!refs.contains("a b c d e")); // 5 tokens, filtered out
    }

    #[test]
    fn keywords_include_pipeline_tag_and_library_name() {
        let mut r = record("m1", &[], "");
        r.pipeline_tag = Some("fill-mask".to_string());
        r.library_name = Some("transformers".to_string());
        let refs = identify_keywords_per_record(&[r]);
        let got = &refs["m1"];
        assert!(got.contains(&"fill-mask".to_string()));
        assert!(got.contains(&"transformers".to_string()));
    }

    #[test]
    fn languages_validate_against_iso639_list() {
        let r = record("m1", &["en", "not-a-lang-code"], "");
        assert_eq!(identify_languages(&[r]), BTreeSet::from(["en".to_string()]));
    }

    #[test]
    fn tasks_normalize_via_known_catalog() {
        let known = BTreeSet::from(["fill-mask".to_string(), "text-generation".to_string()]);
        let mut r = record("m1", &["fill-mask", "unrelated-tag"], "");
        r.pipeline_tag = Some("text-generation".to_string());
        let refs = identify_tasks(&[r], &known);
        assert_eq!(
            refs,
            BTreeSet::from(["fill-mask".to_string(), "text-generation".to_string()])
        );
    }

    #[test]
    fn empty_record_set_yields_empty_reference_set() {
        assert!(identify_datasets(&[]).is_empty());
        assert!(identify_articles(&[]).is_empty());
    }

    #[test]
    fn per_record_map_has_empty_list_when_no_references() {
        let r = record("m1", &[], "");
        let per_record = identify_datasets_per_record(&[r]);
        assert_eq!(per_record.get("m1"), Some(&Vec::<String>::new()));
    }

    #[test]
    fn field_based_platform_identifies_datasets_via_fields() {
        let mut r = record("run1", &[], "");
        r.fields.insert("dataset".to_string(), vec!["d42".to_string()]);
        assert_eq!(identify_datasets(&[r]), BTreeSet::from(["d42".to_string()]));
    }

    #[test]
    fn base_model_iteration_deduplicates_across_rounds() {
        let mut seen = BTreeSet::new();
        let round1 = vec![record("m2", &["base_model:m1"], "")];
        let delta1 = next_base_model_delta(&round1, &mut seen);
        assert_eq!(delta1, BTreeSet::from(["m1".to_string()]));

        // Same reference again: no new delta.
        let round2 = vec![record("m3", &["base_model:m1"], "")];
        let delta2 = next_base_model_delta(&round2, &mut seen);
        assert!(delta2.is_empty());

        let round3 = vec![record("m4", &["base_model:m9"], "")];
        let delta3 = next_base_model_delta(&round3, &mut seen);
        assert_eq!(delta3, BTreeSet::from(["m9".to_string()]));
    }
}
