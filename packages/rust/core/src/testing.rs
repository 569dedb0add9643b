//! In-memory fakes for pipeline tests: scripted fetcher with an in-flight
//! gauge, and failure-injecting sink implementations.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use linkloom_fetch::FetchError;
use linkloom_shared::{
    BookmarkRecord, EnrichedBookmark, EnrichmentFailure, FailureKind, LinkloomError, Result,
    record_id,
};
use linkloom_store::{DocumentStore, ErrorSink, RecordSink, UrlLedger};

use crate::fetcher::ContentFetcher;
use crate::worker::Outcome;

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

pub(crate) fn record(url: &str) -> BookmarkRecord {
    BookmarkRecord {
        url: url.into(),
        name: "Test bookmark".into(),
        folder: String::new(),
        source: "chrome".into(),
    }
}

pub(crate) fn enriched(url: &str, summary: &str) -> Outcome {
    let mut rec = EnrichedBookmark::from_record(&record(url));
    rec.summary = summary.into();
    Outcome::Enriched(rec)
}

pub(crate) fn failure_storable(url: &str, reason: &str) -> Outcome {
    Outcome::FailedStorable {
        record: EnrichedBookmark::from_record(&record(url)),
        failure: EnrichmentFailure {
            url: url.into(),
            name: "Test bookmark".into(),
            reason: reason.into(),
            kind: FailureKind::Terminal,
        },
    }
}

pub(crate) fn failed(url: &str, reason: &str) -> Outcome {
    Outcome::Failed(EnrichmentFailure {
        url: url.into(),
        name: "Test bookmark".into(),
        reason: reason.into(),
        kind: FailureKind::TransientExhausted,
    })
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Scripted fetcher that tracks call counts and concurrent in-flight fetches.
#[derive(Default)]
pub(crate) struct MockFetcher {
    responses: HashMap<String, std::result::Result<String, FetchError>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    pub(crate) fn ok(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.into(), Ok(body.into()));
        self
    }

    pub(crate) fn err(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.into(), Err(error));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").values().sum()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(url.to_string())
            .or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::Other(format!("no scripted response for {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory document store with per-URL and whole-store failure injection.
#[derive(Default)]
pub(crate) struct MockStore {
    records: Mutex<HashMap<String, EnrichedBookmark>>,
    fail_urls: Mutex<HashSet<String>>,
    fail_all: bool,
    existing_lookups: AtomicUsize,
}

impl MockStore {
    pub(crate) fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub(crate) fn seed(&self, url: &str, source: &str, summary: &str) {
        let mut rec = EnrichedBookmark::from_record(&BookmarkRecord {
            url: url.into(),
            name: "Seeded".into(),
            folder: String::new(),
            source: source.into(),
        });
        rec.summary = summary.into();
        self.records
            .lock()
            .expect("records lock")
            .insert(record_id(url, source), rec);
    }

    /// Make every upsert of this URL fail.
    pub(crate) fn fail_url(&self, url: &str) {
        self.fail_urls.lock().expect("fail lock").insert(url.into());
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().expect("records lock").len()
    }

    pub(crate) fn get(&self, url: &str, source: &str) -> Option<EnrichedBookmark> {
        self.records
            .lock()
            .expect("records lock")
            .get(&record_id(url, source))
            .cloned()
    }

    pub(crate) fn existing_calls(&self) -> usize {
        self.existing_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn existing(&self, url: &str, source: &str) -> Result<Option<EnrichedBookmark>> {
        self.existing_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.get(url, source))
    }

    async fn upsert_batch(&self, records: &[EnrichedBookmark]) -> Result<usize> {
        if self.fail_all {
            return Err(LinkloomError::Storage("store unavailable".into()));
        }

        let fail_urls = self.fail_urls.lock().expect("fail lock").clone();
        let mut stored = 0;
        for rec in records {
            if fail_urls.contains(&rec.url) {
                continue;
            }
            self.records
                .lock()
                .expect("records lock")
                .insert(rec.id(), rec.clone());
            stored += 1;
        }
        Ok(stored)
    }
}

// ---------------------------------------------------------------------------
// MockLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MockLedger {
    urls: Mutex<HashSet<String>>,
    fail_writes: bool,
}

impl MockLedger {
    pub(crate) fn with_urls(urls: &[&str]) -> Self {
        Self {
            urls: Mutex::new(urls.iter().map(|u| u.to_string()).collect()),
            fail_writes: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub(crate) fn contains(&self, url: &str) -> bool {
        self.urls.lock().expect("urls lock").contains(url)
    }
}

#[async_trait]
impl UrlLedger for MockLedger {
    async fn is_processed(&self, url: &str) -> Result<bool> {
        Ok(self.contains(url))
    }

    async fn add_many(&self, urls: &[String]) -> Result<()> {
        if self.fail_writes {
            return Err(LinkloomError::Sink("ledger write refused".into()));
        }
        self.urls
            .lock()
            .expect("urls lock")
            .extend(urls.iter().cloned());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock logs
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MockRecordLog {
    entries: Mutex<Vec<EnrichedBookmark>>,
    fail_writes: bool,
}

impl MockRecordLog {
    pub(crate) fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub(crate) fn entries(&self) -> Vec<EnrichedBookmark> {
        self.entries.lock().expect("entries lock").clone()
    }
}

#[async_trait]
impl RecordSink for MockRecordLog {
    async fn append(&self, record: &EnrichedBookmark) -> Result<()> {
        if self.fail_writes {
            return Err(LinkloomError::Sink("record log full".into()));
        }
        self.entries.lock().expect("entries lock").push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockErrorLog {
    entries: Mutex<Vec<EnrichmentFailure>>,
    fail_writes: bool,
}

impl MockErrorLog {
    #[allow(dead_code)]
    pub(crate) fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub(crate) fn entries(&self) -> Vec<EnrichmentFailure> {
        self.entries.lock().expect("entries lock").clone()
    }
}

#[async_trait]
impl ErrorSink for MockErrorLog {
    async fn append(&self, failure: &EnrichmentFailure) -> Result<()> {
        if self.fail_writes {
            return Err(LinkloomError::Sink("error log full".into()));
        }
        self.entries
            .lock()
            .expect("entries lock")
            .push(failure.clone());
        Ok(())
    }
}
