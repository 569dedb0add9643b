//! Core domain types for bookmark enrichment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// BookmarkRecord
// ---------------------------------------------------------------------------

/// A raw bookmark record as produced by a bookmark source, awaiting enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    /// Bookmarked URL.
    pub url: String,
    /// Bookmark title as stored by the browser.
    pub name: String,
    /// Folder path within the browser's bookmark tree (`/`-separated).
    #[serde(default)]
    pub folder: String,
    /// Which browser/source this record came from (e.g., `"chrome"`).
    pub source: String,
}

// ---------------------------------------------------------------------------
// EnrichedBookmark
// ---------------------------------------------------------------------------

/// A bookmark after enrichment: the original fields plus a short summary and
/// cleaned page text, ready for persistence and later semantic indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedBookmark {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub folder: String,
    pub source: String,
    /// Short description extracted from page metadata (may be empty).
    #[serde(default)]
    pub summary: String,
    /// Cleaned main-content text (may be empty).
    #[serde(default)]
    pub body_text: String,
    /// When the page content was fetched (or the record was created).
    pub fetched_at: DateTime<Utc>,
}

impl EnrichedBookmark {
    /// Start an enriched record from a raw bookmark, with empty content fields.
    pub fn from_record(record: &BookmarkRecord) -> Self {
        Self {
            url: record.url.clone(),
            name: record.name.clone(),
            folder: record.folder.clone(),
            source: record.source.clone(),
            summary: String::new(),
            body_text: String::new(),
            fetched_at: Utc::now(),
        }
    }

    /// The deterministic document-store identity for this record.
    pub fn id(&self) -> String {
        record_id(&self.url, &self.source)
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// How a failure should be treated for the remainder of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Must not be retried within the same run (auth, not-found, bad
    /// content type, certificate problems).
    Terminal,
    /// Was retryable, but the attempt budget is spent for this run.
    TransientExhausted,
}

/// A definitive per-record failure for this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentFailure {
    pub url: String,
    pub name: String,
    /// Human-readable failure reason.
    pub reason: String,
    pub kind: FailureKind,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Deterministic document-store identity for a `(url, source)` pair.
///
/// Stable across process restarts, so upserts are idempotent.
pub fn record_id(url: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b":");
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
