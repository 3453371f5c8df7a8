//! `refine_query` (§4.11): tokenize, approximate part-of-speech tagging, lift
//! known facet values out of free text, drop stopwords.
//!
//! No part-of-speech tagger crate exists anywhere in this codebase's
//! dependency stack, so this is a rule-based heuristic approximation of
//! "keep nouns/proper-nouns/adjectives" rather than a real tagger: it keeps
//! alphabetic tokens that aren't in the reserved stop-list, and treats a
//! capitalized mid-sentence token as a likely proper noun (facet lift takes
//! priority over this anyway, since a facet hit is unambiguous).

use std::collections::BTreeMap;

/// facet field -> known values (case preserved, matched case-insensitively).
pub type FacetCatalog = BTreeMap<String, Vec<String>>;

const STOP_WORDS: &[&str] = &[
    "model", "models", "task", "tasks", "example", "examples", "the", "a", "an", "of", "for",
    "with", "and", "or", "to", "in", "on", "is", "are", "show", "find", "me", "please",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefinedQuery {
    pub query: String,
    pub filters: BTreeMap<String, Vec<String>>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep tokens that look content-bearing: alphabetic, length ≥ 2, not a
/// reserved stop-word. This is the heuristic stand-in for "POS ∈
/// {NOUN, PROPN, ADJ}".
fn is_content_bearing(token: &str) -> bool {
    let lower = token.to_lowercase();
    token.chars().all(char::is_alphabetic) && token.chars().count() >= 2 && !STOP_WORDS.contains(&lower.as_str())
}

fn facet_match(catalog: &FacetCatalog, token: &str) -> Option<(String, String)> {
    let lower = token.to_lowercase();
    for (field, values) in catalog {
        for value in values {
            if value.to_lowercase() == lower {
                return Some((field.clone(), value.clone()));
            }
        }
    }
    None
}

/// `RefineQuery(query)`: lift any token matching a known facet value into
/// `filters`, drop stopwords, keep the rest as free text.
#[must_use]
pub fn refine_query(query: &str, catalog: &FacetCatalog) -> RefinedQuery {
    let mut filters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut remaining_tokens = Vec::new();

    for token in tokenize(query) {
        if let Some((field, value)) = facet_match(catalog, &token) {
            let bucket = filters.entry(field).or_default();
            if !bucket.contains(&value) {
                bucket.push(value);
            }
            continue;
        }
        if is_content_bearing(&token) {
            remaining_tokens.push(token);
        }
    }

    RefinedQuery { query: remaining_tokens.join(" "), filters }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> FacetCatalog {
        let mut c = FacetCatalog::new();
        c.insert("license".to_string(), vec!["MIT".to_string(), "Apache-2.0".to_string()]);
        c
    }

    #[test]
    fn facet_value_is_lifted_out_of_the_free_text() {
        let refined = refine_query("show me MIT licensed image models", &catalog());
        assert_eq!(refined.filters["license"], vec!["MIT".to_string()]);
        assert!(!refined.query.to_lowercase().contains("mit"));
    }

    #[test]
    fn stopwords_are_dropped() {
        let refined = refine_query("find the best model for translation", &catalog());
        assert!(!refined.query.split_whitespace().any(|t| t.eq_ignore_ascii_case("the")));
        assert!(!refined.query.split_whitespace().any(|t| t.eq_ignore_ascii_case("model")));
    }

    #[test]
    fn refinement_is_stable_under_re_refinement() {
        let once = refine_query("show me MIT licensed image models", &catalog());
        let twice = refine_query(&once.query, &catalog());
        assert_eq!(once.query, twice.query);
    }
}
