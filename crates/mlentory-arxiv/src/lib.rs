//! arXiv enrichment client (§4.4): batched id lookups against the Atom export
//! API, 6s back-off between batches, stub on miss so every requested id
//! surfaces in the output.

use async_trait::async_trait;
use mlentory_core::enrich::{EnrichedRecord, EnrichmentClient};
use mlentory_core::model::ScholarlyArticle;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";
const BATCH_BACKOFF: Duration = Duration::from_secs(6);

/// Configuration for the arXiv enrichment client (§6.4 `enrichment.arxiv`).
#[derive(Debug, Clone)]
pub struct ArxivClientConfig {
    pub base_url: String,
    pub batch_size: usize,
    pub concurrency: usize,
}

impl Default for ArxivClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            batch_size: 50,
            concurrency: 4,
        }
    }
}

/// One arXiv Atom `<entry>`, reduced to the fields a `ScholarlyArticle` needs.
#[derive(Debug, Clone, Default)]
struct ArxivEntry {
    id: String,
    title: String,
    summary: String,
    authors: Vec<String>,
    published: Option<String>,
    updated: Option<String>,
}

/// The arXiv enrichment client.
pub struct ArxivClient {
    http: reqwest::Client,
    config: ArxivClientConfig,
}

impl ArxivClient {
    #[must_use]
    pub fn new(config: ArxivClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// arXiv ids may carry a version suffix (`2106.09685v2`); the API's
    /// `id_list` lookup and the identifier stage both key on the bare id.
    fn normalize_id(id: &str) -> String {
        match id.rfind('v') {
            Some(pos) if id[pos + 1..].chars().all(|c| c.is_ascii_digit()) && pos + 1 < id.len() => {
                id[..pos].to_string()
            }
            _ => id.to_string(),
        }
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<ArxivEntry>, String> {
        let id_list = ids
            .iter()
            .map(|id| Self::normalize_id(id))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}?id_list={id_list}&max_results={}",
            self.config.base_url,
            ids.len()
        );
        let response = self.http.get(&url).send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("arxiv batch request returned {}", response.status()));
        }
        let xml = response.text().await.map_err(|e| e.to_string())?;
        parse_entries(&xml).map_err(|e| e.to_string())
    }

    fn entry_to_record(id: &str, entry: Option<ArxivEntry>) -> EnrichedRecord<ScholarlyArticle> {
        match entry {
            Some(entry) => {
                let article = ScholarlyArticle {
                    identifier: vec![id.to_string()],
                    name: Some(entry.title.trim().to_string()),
                    url: Some(format!("https://arxiv.org/abs/{id}")),
                    same_as: Vec::new(),
                    description: Some(entry.summary.trim().to_string()),
                    about: Vec::new(),
                    author: entry.authors,
                    date_published: entry.published,
                    date_modified: entry.updated,
                    is_part_of: None,
                    comment: None,
                    extraction_metadata: std::collections::HashMap::new(),
                };
                EnrichedRecord::found(id, article, 0.9)
            }
            None => EnrichedRecord::stub(id, "not found in arxiv response"),
        }
    }
}

fn parse_entries(xml: &str) -> Result<Vec<ArxivEntry>, quick_xml::Error> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<ArxivEntry> = None;
    let mut in_entry = false;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "entry" {
                    in_entry = true;
                    current = Some(ArxivEntry::default());
                } else if name == "author" && in_entry {
                    in_author = true;
                }
            }
            Ok(Event::Text(e)) => {
                text = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                    in_entry = false;
                } else if name == "author" {
                    in_author = false;
                } else if in_entry {
                    if let Some(entry) = current.as_mut() {
                        match name.as_str() {
                            "id" => entry.id = text.clone(),
                            "title" => entry.title = text.clone(),
                            "summary" => entry.summary = text.clone(),
                            "published" => entry.published = Some(text.clone()),
                            "updated" => entry.updated = Some(text.clone()),
                            "name" if in_author => entry.authors.push(text.clone()),
                            _ => {}
                        }
                    }
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }
    Ok(entries)
}

/// Extracts the bare arXiv id (no version) from an Atom `<id>` URL so looked-up
/// entries can be matched back against the requested, normalized id.
fn entry_bare_id(entry: &ArxivEntry) -> Option<String> {
    let last_segment = entry.id.rsplit('/').next()?;
    Some(ArxivClient::normalize_id(last_segment))
}

#[async_trait]
impl EnrichmentClient<EnrichedRecord<ScholarlyArticle>> for ArxivClient {
    fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    async fn fetch_specific(&self, ids: &[String]) -> Vec<EnrichedRecord<ScholarlyArticle>> {
        if ids.is_empty() {
            return Vec::new();
        }
        let normalized: Vec<String> = ids.iter().map(|id| Self::normalize_id(id)).collect();
        let mut out = Vec::with_capacity(ids.len());
        for (batch_index, chunk) in normalized.chunks(self.config.batch_size.max(1)).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(BATCH_BACKOFF).await;
            }
            tracing::debug!(batch = batch_index, size = chunk.len(), "fetching arxiv batch");
            match self.fetch_batch(chunk).await {
                Ok(entries) => {
                    for requested_id in chunk {
                        let found = entries
                            .iter()
                            .find(|e| entry_bare_id(e).as_deref() == Some(requested_id.as_str()))
                            .cloned();
                        out.push(Self::entry_to_record(requested_id, found));
                    }
                }
                Err(reason) => {
                    for requested_id in chunk {
                        out.push(EnrichedRecord::stub(requested_id, &reason));
                    }
                }
            }
        }
        out
    }
}
