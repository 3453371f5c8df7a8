//! Language enrichment client (§4.4): a static ISO 639-1 code table, no
//! network. Mirrors the identification stage's own code list so every
//! identified language code resolves here.

use async_trait::async_trait;
use mlentory_core::enrich::{EnrichedRecord, EnrichmentClient};
use mlentory_core::model::Language;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// (code, English name) pairs for the languages the identification stage
/// recognizes.
const ISO_639_1: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("de", "German"),
    ("es", "Spanish"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("nl", "Dutch"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("bn", "Bengali"),
    ("pa", "Punjabi"),
    ("sv", "Swedish"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
    ("vi", "Vietnamese"),
    ("th", "Thai"),
    ("fa", "Persian"),
    ("he", "Hebrew"),
    ("el", "Greek"),
    ("cs", "Czech"),
    ("fi", "Finnish"),
    ("da", "Danish"),
    ("no", "Norwegian"),
    ("hu", "Hungarian"),
    ("ro", "Romanian"),
    ("uk", "Ukrainian"),
];

fn table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| ISO_639_1.iter().copied().collect())
}

/// Configuration for the language enrichment client (§6.4 `enrichment.language`).
#[derive(Debug, Clone)]
pub struct PycountryClientConfig {
    pub concurrency: usize,
}

impl Default for PycountryClientConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

/// The language enrichment client. Pure lookup against a static table, so
/// concurrency only exists to keep the interface uniform with the other
/// enrichment clients.
pub struct PycountryClient {
    config: PycountryClientConfig,
}

impl PycountryClient {
    #[must_use]
    pub fn new(config: PycountryClientConfig) -> Self {
        Self { config }
    }

    fn lookup(code: &str) -> Option<Language> {
        let name = table().get(code.to_lowercase().as_str())?;
        Some(Language {
            identifier: vec![code.to_string()],
            name: Some((*name).to_string()),
            url: Some(format!("https://iso639-3.sil.org/code/{code}")),
            same_as: Vec::new(),
            alternate_name: Vec::new(),
            description: None,
            extraction_metadata: HashMap::new(),
        })
    }

    /// The set of codes this client can resolve, for diagnostics.
    #[must_use]
    pub fn known_codes() -> HashSet<&'static str> {
        ISO_639_1.iter().map(|(code, _)| *code).collect()
    }
}

#[async_trait]
impl EnrichmentClient<EnrichedRecord<Language>> for PycountryClient {
    fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    async fn fetch_specific(&self, ids: &[String]) -> Vec<EnrichedRecord<Language>> {
        mlentory_core::enrich::fetch_with_stubbing(ids, self.concurrency(), |code| async move {
            match Self::lookup(&code) {
                Some(language) => Ok(EnrichedRecord::found(code, language, 1.0)),
                None => Ok(EnrichedRecord::stub(&code, "not a known iso 639-1 code")),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(PycountryClient::lookup("EN").unwrap().name.as_deref(), Some("English"));
    }

    #[test]
    fn unknown_code_returns_none() {
        assert!(PycountryClient::lookup("zz").is_none());
    }

    #[tokio::test]
    async fn fetch_specific_resolves_known_and_stubs_unknown() {
        let client = PycountryClient::new(PycountryClientConfig::default());
        let out = client
            .fetch_specific(&["en".to_string(), "zz".to_string()])
            .await;
        assert_eq!(out.len(), 2);
        let known = out.iter().find(|r| r.id == "en").unwrap();
        assert!(known.enriched);
        let unknown = out.iter().find(|r| r.id == "zz").unwrap();
        assert!(!unknown.enriched);
    }
}
