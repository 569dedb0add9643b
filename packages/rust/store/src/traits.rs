//! Sink contracts consumed by the enrichment pipeline.
//!
//! The pipeline takes these as trait handles (dependency injection) so sink
//! lifecycles are owned by the caller and tests can substitute in-memory
//! fakes. All implementations must tolerate concurrent calls from a single
//! batch run.

use async_trait::async_trait;
use linkloom_shared::{EnrichedBookmark, EnrichmentFailure, Result};

/// Persistent document store keyed by the `(url, source)` digest.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look up an existing record for a `(url, source)` pair.
    async fn existing(&self, url: &str, source: &str) -> Result<Option<EnrichedBookmark>>;

    /// Upsert a batch of records, returning how many succeeded.
    ///
    /// A failed record must not abort the rest of the batch.
    async fn upsert_batch(&self, records: &[EnrichedBookmark]) -> Result<usize>;
}

/// Append-only ledger of URLs that have been processed, independent of
/// document-store state.
#[async_trait]
pub trait UrlLedger: Send + Sync {
    /// Whether this URL was already processed in a previous run.
    async fn is_processed(&self, url: &str) -> Result<bool>;

    /// Record URLs as processed.
    async fn add_many(&self, urls: &[String]) -> Result<()>;
}

/// Append-only log of enriched records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &EnrichedBookmark) -> Result<()>;
}

/// Append-only log of enrichment failures.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn append(&self, failure: &EnrichmentFailure) -> Result<()>;
}
