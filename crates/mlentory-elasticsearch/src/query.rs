//! Faceted query compiler (§4.9): compiles `(text_query, filters, facets,
//! pagination)` into an Elasticsearch request body. Pure functions so the
//! compiled JSON can be asserted against without a live store.

use regex::escape;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;

const MIN_PAGE_SIZE: usize = 1;
const MAX_PAGE_SIZE: usize = 1000;

/// One requested facet: the mapped keyword field, an optional value-search
/// substring, and the bucket count.
#[derive(Debug, Clone)]
pub struct FacetRequest {
    pub field: String,
    pub size: usize,
    pub search: Option<String>,
}

/// A date-range filter with inclusive bounds (either side may be open).
#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub gte: Option<String>,
    pub lte: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text_query: String,
    /// Keyword-field term filters (facet field -> accepted values).
    pub filters: BTreeMap<String, Vec<String>>,
    /// Keyword-field date filters.
    pub date_filters: BTreeMap<String, DateRange>,
    pub facets: Vec<FacetRequest>,
    pub page: usize,
    pub page_size: usize,
}

const MULTI_MATCH_FIELDS: &[(&str, f32)] = &[
    ("name", 2.0),
    ("keywords", 5.0),
    ("description", 2.5),
    ("mlTask", 1.0),
    ("sharedBy", 1.0),
];

/// Tokenize on whitespace and `-_.`, keep the full phrase, then emit
/// consecutive bigrams (step 1-2 of the text matching strategy).
#[must_use]
pub fn tokenize(text_query: &str) -> (Vec<String>, Vec<String>) {
    let tokens: Vec<String> = text_query
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    let bigrams = tokens
        .windows(2)
        .map(|w| format!("{} {}", w[0], w[1]))
        .collect();
    (tokens, bigrams)
}

fn multi_match(phrase: &str, boost_scale: f32, kind: &str) -> JsonValue {
    let fields: Vec<String> = MULTI_MATCH_FIELDS
        .iter()
        .map(|(field, weight)| format!("{field}^{}", weight * boost_scale))
        .collect();
    json!({
        "multi_match": {
            "query": phrase,
            "type": kind,
            "fields": fields
        }
    })
}

fn wildcard_clauses(token: &str) -> Vec<JsonValue> {
    if token.chars().count() < 2 {
        return Vec::new();
    }
    let pattern = format!("*{token}*");
    vec![
        json!({ "wildcard": { "keywords": { "value": pattern } } }),
        json!({ "wildcard": { "mlTask": { "value": pattern } } }),
    ]
}

/// Build the `bool`/`should` text query clause (empty `text_query` yields
/// `match_all`).
#[must_use]
pub fn build_text_clause(text_query: &str) -> JsonValue {
    let trimmed = text_query.trim();
    if trimmed.is_empty() {
        return json!({ "match_all": {} });
    }

    let (tokens, bigrams) = tokenize(trimmed);
    let mut should: Vec<JsonValue> = vec![
        multi_match(trimmed, 1.0, "cross_fields"),
        multi_match(trimmed, 0.8, "best_fields"),
    ];
    for bigram in &bigrams {
        should.push(multi_match(bigram, 1.0, "cross_fields"));
    }
    for token in &tokens {
        should.push(multi_match(token, 1.0, "cross_fields"));
        should.push(multi_match(token, 0.8, "best_fields"));
        should.extend(wildcard_clauses(token));
    }

    json!({ "bool": { "should": should, "minimum_should_match": 1 } })
}

fn filter_clauses(query: &SearchQuery) -> Vec<JsonValue> {
    let mut filters = Vec::new();
    for (field, values) in &query.filters {
        if values.is_empty() {
            continue;
        }
        filters.push(json!({ "terms": { field: values } }));
    }
    for (field, range) in &query.date_filters {
        let mut bounds = serde_json::Map::new();
        if let Some(gte) = &range.gte {
            bounds.insert("gte".to_string(), json!(gte));
        }
        if let Some(lte) = &range.lte {
            bounds.insert("lte".to_string(), json!(lte));
        }
        if !bounds.is_empty() {
            filters.push(json!({ "range": { field: bounds } }));
        }
    }
    filters
}

fn facet_aggregation(facet: &FacetRequest) -> JsonValue {
    let mut terms = json!({
        "field": facet.field,
        "size": facet.size,
        "order": { "_count": "desc" }
    });
    if let Some(search) = &facet.search {
        terms["include"] = json!(format!(".*{}.*", escape(&search.to_lowercase())));
    }
    json!({ "terms": terms })
}

/// Clamp a requested page size to `[1, 1000]` (§4.9 guarantee).
#[must_use]
pub fn clamp_page_size(page_size: usize) -> usize {
    page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Compile `query` into a full Elasticsearch search request body.
#[must_use]
pub fn compile(query: &SearchQuery) -> JsonValue {
    let page_size = clamp_page_size(query.page_size);
    let page = query.page.max(1);
    let from = (page - 1) * page_size;

    let mut bool_query = json!({
        "must": [build_text_clause(&query.text_query)],
    });
    let filters = filter_clauses(query);
    if !filters.is_empty() {
        bool_query["filter"] = json!(filters);
    }

    let mut body = json!({
        "query": { "bool": bool_query },
        "from": from,
        "size": page_size
    });

    if !query.facets.is_empty() {
        let mut aggs = serde_json::Map::new();
        for facet in &query.facets {
            aggs.insert(facet.field.clone(), facet_aggregation(facet));
        }
        body["aggs"] = JsonValue::Object(aggs);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_query_and_filters_matches_everything() {
        let query = SearchQuery { page: 1, page_size: 20, ..Default::default() };
        let body = compile(&query);
        assert_eq!(body["query"]["bool"]["must"][0], json!({ "match_all": {} }));
        assert!(body["query"]["bool"].get("filter").is_none());
    }

    #[test]
    fn page_size_is_clamped_to_the_documented_range() {
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(5000), 1000);
        assert_eq!(clamp_page_size(50), 50);
    }

    #[test]
    fn tokenize_emits_bigrams_and_splits_on_separators() {
        let (tokens, bigrams) = tokenize("bert-base_uncased finetune");
        assert_eq!(tokens, vec!["bert", "base", "uncased", "finetune"]);
        assert_eq!(bigrams, vec!["bert base", "base uncased", "uncased finetune"]);
    }

    #[test]
    fn term_filter_is_compiled_as_a_terms_query() {
        let mut query = SearchQuery { page: 1, page_size: 20, ..Default::default() };
        query.filters.insert("license".to_string(), vec!["MIT".to_string()]);
        let body = compile(&query);
        assert_eq!(body["query"]["bool"]["filter"][0]["terms"]["license"], json!(["MIT"]));
    }

    #[test]
    fn facet_search_substring_is_escaped_into_an_includes_regex() {
        let facet = FacetRequest { field: "license".to_string(), size: 10, search: Some("c++".to_string()) };
        let agg = facet_aggregation(&facet);
        assert_eq!(agg["terms"]["include"], json!(".*c\\+\\+.*"));
    }
}
