//! Enrichment clients (§4.4): fetch external metadata for referenced entities
//! with bounded parallelism and per-id stubbing on failure.

use crate::model::ExtractionMetadata;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Anything that can stand in for a failed or missing lookup while keeping the
/// requesting id addressable downstream (§4.4, GLOSSARY "Stub").
pub trait Stubbable {
    /// Build a stub for `id` explaining why the lookup produced nothing.
    fn stub(id: &str, reason: &str) -> Self;
}

/// Fetch metadata for every id in `ids`, running at most `concurrency` lookups at
/// once, and guaranteeing the output contains exactly one record per input id
/// (§8, invariant 1 "stub completeness") — a failed future is converted into a
/// stub rather than propagated or dropped.
pub async fn fetch_with_stubbing<T, F, Fut>(
    ids: &[String],
    concurrency: usize,
    fetch_one: F,
) -> Vec<T>
where
    T: Stubbable + Send,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, String>> + Send,
{
    if ids.is_empty() {
        return Vec::new();
    }
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let fetch_one = Arc::new(fetch_one);

    stream::iter(ids.iter().cloned())
        .map(|id| {
            let semaphore = Arc::clone(&semaphore);
            let fetch_one = Arc::clone(&fetch_one);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("semaphore is never closed");
                match fetch_one(id.clone()).await {
                    Ok(record) => record,
                    Err(reason) => T::stub(&id, &reason),
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

/// A record produced by an enrichment client: either real data or a stub.
/// A fetch result for one requested id: either the looked-up record (`enriched`)
/// or a stub recording why it could not be found (§4.2 `FetchSpecific`).
///
/// Serializes as the `2_normalized/<kind>.json` artifact line shape (§6.1):
/// enriched and stub records share one schema so downstream readers never have
/// to branch on which one they got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord<T> {
    pub id: String,
    pub enriched: bool,
    pub data: Option<T>,
    pub extraction_metadata: ExtractionMetadata,
}

impl<T> Stubbable for EnrichedRecord<T> {
    fn stub(id: &str, reason: &str) -> Self {
        Self {
            id: id.to_string(),
            enriched: false,
            data: None,
            extraction_metadata: ExtractionMetadata::stub(reason),
        }
    }
}

impl<T> EnrichedRecord<T> {
    /// Build a successfully enriched record.
    #[must_use]
    pub fn found(id: impl Into<String>, data: T, confidence: f64) -> Self {
        Self {
            id: id.into(),
            enriched: true,
            data: Some(data),
            extraction_metadata: ExtractionMetadata::api_lookup(confidence),
        }
    }
}

/// The common shape of a per-entity-kind enrichment client: given a reference
/// set, fetch metadata for every id, never dropping one.
#[async_trait]
pub trait EnrichmentClient<T>: Send + Sync
where
    T: Stubbable + Send,
{
    /// Parallelism cap to pass to [`fetch_with_stubbing`].
    fn concurrency(&self) -> usize;

    /// Fetch metadata for `ids`, stubbing any id whose lookup fails.
    async fn fetch_specific(&self, ids: &[String]) -> Vec<T>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        id: String,
        ok: bool,
    }

    impl Stubbable for Rec {
        fn stub(id: &str, _reason: &str) -> Self {
            Self {
                id: id.to_string(),
                ok: false,
            }
        }
    }

    #[tokio::test]
    async fn empty_reference_set_yields_empty_output_and_no_calls() {
        let calls = Arc::new(tokio::sync::Mutex::new(0usize));
        let calls2 = Arc::clone(&calls);
        let out = fetch_with_stubbing::<Rec, _, _>(&[], 4, move |id| {
            let calls = Arc::clone(&calls2);
            async move {
                *calls.lock().await += 1;
                Ok(Rec { id, ok: true })
            }
        })
        .await;
        assert!(out.is_empty());
        assert_eq!(*calls.lock().await, 0);
    }

    #[tokio::test]
    async fn every_id_appears_exactly_once_enriched_or_stubbed() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let out = fetch_with_stubbing::<Rec, _, _>(&ids, 2, |id| async move {
            if id == "b" {
                Err("boom".to_string())
            } else {
                Ok(Rec { id, ok: true })
            }
        })
        .await;
        assert_eq!(out.len(), 3);
        let mut ids_out: Vec<_> = out.iter().map(|r| r.id.clone()).collect();
        ids_out.sort();
        assert_eq!(ids_out, vec!["a", "b", "c"]);
        let b = out.iter().find(|r| r.id == "b").unwrap();
        assert!(!b.ok);
    }

    #[tokio::test]
    async fn concurrency_cap_is_respected() {
        let active = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let max_seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ids: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let active2 = Arc::clone(&active);
        let max_seen2 = Arc::clone(&max_seen);
        let _out = fetch_with_stubbing::<Rec, _, _>(&ids, 3, move |id| {
            let active = Arc::clone(&active2);
            let max_seen = Arc::clone(&max_seen2);
            async move {
                let now = active.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, std::sync::atomic::Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                active.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                Ok(Rec { id, ok: true })
            }
        })
        .await;
        assert!(max_seen.load(std::sync::atomic::Ordering::SeqCst) <= 3);
    }

    #[test]
    fn enriched_record_stub_carries_reason_in_notes() {
        let rec: EnrichedRecord<()> = EnrichedRecord::stub("x", "404 not found");
        assert!(!rec.enriched);
        assert_eq!(rec.extraction_metadata.notes.as_deref(), Some("404 not found"));
    }

    #[test]
    fn enriched_record_round_trips_through_ndjson() {
        let rec = EnrichedRecord::found("d1", "payload".to_string(), 0.8);
        let line = serde_json::to_string(&rec).unwrap();
        let back: EnrichedRecord<String> = serde_json::from_str(&line).unwrap();
        assert_eq!(rec, back);
    }
}
