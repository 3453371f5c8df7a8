//! MLentory IRI minting.
//!
//! Every normalized entity gets one stable, deterministic IRI under
//! `https://w3id.org/mlentory/mlentory_graph/<kind>/<sha256(kind, platform, id)>`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The entity kinds the normalizers emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An ML model record (FAIR4ML `MLModel`).
    MlModel,
    /// A paper referenced by a model (`ScholarlyArticle`).
    Article,
    /// A license (`CreativeWork`).
    License,
    /// A training/evaluation dataset (`Dataset`).
    Dataset,
    /// A task or keyword term (`DefinedTerm`).
    Term,
    /// A natural language (`Language`).
    Language,
}

impl EntityKind {
    /// The path segment used when minting an IRI for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MlModel => "model",
            Self::Article => "article",
            Self::License => "license",
            Self::Dataset => "dataset",
            Self::Term => "term",
            Self::Language => "language",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const NAMESPACE: &str = "https://w3id.org/mlentory/mlentory_graph";

/// Mint a deterministic MLentory IRI for `(kind, platform, id)`.
///
/// Stable across processes and time: the same logical entity on the same platform
/// always produces the same IRI (§8, invariant 2).
#[must_use]
pub fn mint_iri(kind: EntityKind, platform: &str, id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(platform.as_bytes());
    hasher.update(b"\0");
    hasher.update(id.as_bytes());
    let digest = hasher.finalize();
    format!("{NAMESPACE}/{}/{}", kind.as_str(), hex::encode(digest))
}

/// Mint a fallback IRI for an entity whose only identifiers are malformed.
///
/// Used by the RDF loader (§4.6) when no candidate identifier parses as an absolute IRI:
/// the subject is still derived deterministically from whatever identifiers are present,
/// so a record with no valid IRI still loads instead of being dropped.
#[must_use]
pub fn mint_fallback_iri(kind: EntityKind, raw_identifiers: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"fallback\0");
    hasher.update(kind.as_str().as_bytes());
    for id in raw_identifiers {
        hasher.update(b"\0");
        hasher.update(id.as_bytes());
    }
    let digest = hasher.finalize();
    format!("{NAMESPACE}/{}/{}", kind.as_str(), hex::encode(digest))
}

/// Whether `s` parses as a syntactically valid absolute IRI (scheme + authority).
///
/// Deliberately permissive: the spec (§3.2) requires only IRI-valued predicates to be
/// "syntactically valid absolute IRIs", not resolvable URLs.
#[must_use]
pub fn is_absolute_iri(s: &str) -> bool {
    match s.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
                && !rest.is_empty()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minting_is_deterministic() {
        let a = mint_iri(EntityKind::MlModel, "huggingface", "bert-base-uncased");
        let b = mint_iri(EntityKind::MlModel, "huggingface", "bert-base-uncased");
        assert_eq!(a, b);
    }

    #[test]
    fn minting_differs_by_kind_platform_and_id() {
        let model = mint_iri(EntityKind::MlModel, "huggingface", "x");
        let dataset = mint_iri(EntityKind::Dataset, "huggingface", "x");
        let other_platform = mint_iri(EntityKind::MlModel, "openml", "x");
        let other_id = mint_iri(EntityKind::MlModel, "huggingface", "y");
        assert_ne!(model, dataset);
        assert_ne!(model, other_platform);
        assert_ne!(model, other_id);
    }

    #[test]
    fn minted_iri_is_namespaced_and_absolute() {
        let iri = mint_iri(EntityKind::Article, "huggingface", "2106.09685");
        assert!(iri.starts_with("https://w3id.org/mlentory/mlentory_graph/article/"));
        assert!(is_absolute_iri(&iri));
    }

    #[test]
    fn fallback_iri_is_deterministic_and_distinct_from_primary() {
        let ids = vec!["not a uri".to_string(), "also-not".to_string()];
        let a = mint_fallback_iri(EntityKind::Dataset, &ids);
        let b = mint_fallback_iri(EntityKind::Dataset, &ids);
        assert_eq!(a, b);
        let primary = mint_iri(EntityKind::Dataset, "huggingface", "not a uri");
        assert_ne!(a, primary);
    }

    #[test]
    fn absolute_iri_detection() {
        assert!(is_absolute_iri("https://example.com/a/b"));
        assert!(is_absolute_iri("urn:isbn:0451450523"));
        assert!(!is_absolute_iri("not a uri"));
        assert!(!is_absolute_iri("/relative/path"));
        assert!(!is_absolute_iri(""));
    }

    proptest::proptest! {
        #[test]
        fn minting_never_panics(kind_idx in 0..6usize, platform in "[a-z]{1,10}", id in ".{0,40}") {
            let kind = [
                EntityKind::MlModel,
                EntityKind::Article,
                EntityKind::License,
                EntityKind::Dataset,
                EntityKind::Term,
                EntityKind::Language,
            ][kind_idx];
            let iri = mint_iri(kind, &platform, &id);
            prop_assert!(iri.starts_with(NAMESPACE));
        }
    }
}
