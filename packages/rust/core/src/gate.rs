//! Deduplication gate: decides which candidates actually need enrichment.
//!
//! The gate consults the processed-URL ledger first (cheap, in-memory) and
//! only then the document store. A stored record only counts as "done" when
//! its summary passes the validity predicate — records whose summaries carry
//! failure markers are reprocessed, which is how earlier failed enrichments
//! self-heal on a later run.

use linkloom_shared::BookmarkRecord;
use linkloom_store::{DocumentStore, UrlLedger};
use tracing::{debug, info, warn};

/// A summary shorter than this (after trimming) never counts as valid.
const MIN_VALID_SUMMARY_CHARS: usize = 10;

/// Substrings that mark a stored summary as a placeholder or failure note.
const FAILURE_MARKERS: &[&str] = &[
    "skipped:",
    "summary unavailable",
    "summary generation failed",
    "failed to fetch",
    "no meaningful text",
    "authentication",
    "access denied",
    "not accessible",
];

/// Why a candidate was excluded from the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// URL already in the processed-URL ledger.
    AlreadyProcessed,
    /// Document store holds a record with a valid summary.
    HasValidSummary,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyProcessed => write!(f, "already processed"),
            Self::HasValidSummary => write!(f, "existing valid summary"),
        }
    }
}

/// A candidate the gate excluded, with a human-readable reason.
#[derive(Debug, Clone)]
pub struct SkippedBookmark {
    pub url: String,
    pub source: String,
    pub reason: SkipReason,
}

/// Result of gating a candidate batch.
#[derive(Debug, Default)]
pub struct GateOutcome {
    /// Candidates that need enrichment, in input order.
    pub working_set: Vec<BookmarkRecord>,
    /// Candidates excluded from this run.
    pub skipped: Vec<SkippedBookmark>,
}

/// Whether a stored summary is good enough to skip reprocessing.
pub fn is_valid_summary(summary: &str) -> bool {
    let trimmed = summary.trim();
    if trimmed.is_empty() {
        return false;
    }

    let lower = trimmed.to_lowercase();
    if FAILURE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return false;
    }

    trimmed.chars().count() > MIN_VALID_SUMMARY_CHARS
}

/// Filter `candidates` down to the records that need enrichment.
///
/// Sink lookup errors bias toward reprocessing: a record we cannot check is
/// treated as new work rather than silently dropped. A positive `limit`
/// truncates the working set after dedup, so the cap is spent on genuinely
/// new work.
pub async fn filter_candidates(
    candidates: Vec<BookmarkRecord>,
    store: &dyn DocumentStore,
    ledger: &dyn UrlLedger,
    limit: i64,
) -> GateOutcome {
    let total = candidates.len();
    let mut outcome = GateOutcome::default();

    for record in candidates {
        if record.url.is_empty() {
            debug!(name = %record.name, "candidate without URL, ignoring");
            continue;
        }

        match ledger.is_processed(&record.url).await {
            Ok(true) => {
                outcome.skipped.push(SkippedBookmark {
                    url: record.url,
                    source: record.source,
                    reason: SkipReason::AlreadyProcessed,
                });
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(url = %record.url, error = %e, "ledger lookup failed, treating as unprocessed");
            }
        }

        match store.existing(&record.url, &record.source).await {
            Ok(Some(existing)) if is_valid_summary(&existing.summary) => {
                outcome.skipped.push(SkippedBookmark {
                    url: record.url,
                    source: record.source,
                    reason: SkipReason::HasValidSummary,
                });
            }
            Ok(Some(_)) => {
                debug!(url = %record.url, "stored summary invalid, reprocessing");
                outcome.working_set.push(record);
            }
            Ok(None) => outcome.working_set.push(record),
            Err(e) => {
                warn!(url = %record.url, error = %e, "store lookup failed, treating as new");
                outcome.working_set.push(record);
            }
        }
    }

    if limit > 0 && outcome.working_set.len() > limit as usize {
        info!(
            limit,
            found = outcome.working_set.len(),
            "capping working set"
        );
        outcome.working_set.truncate(limit as usize);
    }

    info!(
        total,
        working = outcome.working_set.len(),
        skipped = outcome.skipped.len(),
        "dedup gate complete"
    );

    outcome
}
