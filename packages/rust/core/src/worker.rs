//! Enrichment worker: fetch + extract for a single bookmark record.
//!
//! The attempt loop is modeled as an explicit state machine
//! (`Pending → Fetching → Extracting → Succeeded | RetryScheduled | Failed`)
//! with pure transition functions, so the nested retry budgets — the
//! fetcher's own attempts below, the enrichment attempts here — stay
//! testable without any I/O. Failure can occur at either the network layer
//! or the extraction layer, and each has its own bounded patience.

use std::time::Duration;

use chrono::Utc;
use linkloom_shared::{BookmarkRecord, EnrichedBookmark, EnrichmentFailure, FailureKind};
use tracing::{debug, warn};

use crate::fetcher::ContentFetcher;

/// Reason recorded when a fetch succeeded but nothing could be extracted.
const EXTRACTION_EMPTY_REASON: &str = "no content extracted from HTML";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of enriching one bookmark record. Exactly one outcome is produced
/// per record per run.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Enrichment succeeded (content fields may still be empty).
    Enriched(EnrichedBookmark),
    /// Enrichment failed; nothing is stored.
    Failed(EnrichmentFailure),
    /// Auth/access-denied/not-found: a storable placeholder record AND an
    /// error-log entry are both emitted, so the caller can persist the
    /// bookmark while keeping an audit trail. Intentional policy, not an
    /// accident.
    FailedStorable {
        record: EnrichedBookmark,
        failure: EnrichmentFailure,
    },
}

impl Outcome {
    /// URL this outcome belongs to.
    pub fn url(&self) -> &str {
        match self {
            Self::Enriched(r) => &r.url,
            Self::Failed(f) => &f.url,
            Self::FailedStorable { record, .. } => &record.url,
        }
    }

    /// The storable record, when one exists.
    pub fn record(&self) -> Option<&EnrichedBookmark> {
        match self {
            Self::Enriched(r) => Some(r),
            Self::FailedStorable { record, .. } => Some(record),
            Self::Failed(_) => None,
        }
    }

    /// The failure, when one exists.
    pub fn failure(&self) -> Option<&EnrichmentFailure> {
        match self {
            Self::Failed(f) => Some(f),
            Self::FailedStorable { failure, .. } => Some(failure),
            Self::Enriched(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Retry policy & state machine
// ---------------------------------------------------------------------------

/// Budget for whole fetch-and-extract sequences (the fetcher applies its own
/// inner budget per network attempt).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total enrichment attempts per record.
    pub max_attempts: usize,
    /// Base backoff delay; scaled linearly by attempt number.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `next_attempt` (scaled by the attempt just
    /// finished).
    pub fn backoff(&self, finished_attempt: usize) -> Duration {
        self.base_delay * finished_attempt as u32
    }
}

/// States of one record's enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EnrichState {
    Pending,
    Fetching { attempt: usize },
    Extracting { attempt: usize },
    RetryScheduled { next_attempt: usize, delay: Duration },
    Succeeded,
    Failed,
}

impl EnrichState {
    /// Enter the next fetch: from `Pending` this is attempt 1; from
    /// `RetryScheduled` it is the scheduled attempt.
    pub(crate) fn begin_fetch(self) -> Self {
        match self {
            Self::Pending => Self::Fetching { attempt: 1 },
            Self::RetryScheduled { next_attempt, .. } => Self::Fetching {
                attempt: next_attempt,
            },
            other => other,
        }
    }

    /// Fetch body arrived; move to extraction.
    pub(crate) fn begin_extract(self) -> Self {
        match self {
            Self::Fetching { attempt } => Self::Extracting { attempt },
            other => other,
        }
    }

    /// Decide what follows an extraction pass.
    pub(crate) fn after_extract(self, got_content: bool, policy: &RetryPolicy) -> Self {
        let Self::Extracting { attempt } = self else {
            return self;
        };
        if got_content {
            Self::Succeeded
        } else if attempt < policy.max_attempts {
            Self::RetryScheduled {
                next_attempt: attempt + 1,
                delay: policy.backoff(attempt),
            }
        } else {
            Self::Failed
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Enrich one bookmark record.
///
/// With `include_content` off (or an empty URL) the record passes through
/// unchanged. Otherwise the fetch-and-extract sequence runs under the retry
/// policy; extraction results never overwrite non-empty fields with empty
/// ones.
pub async fn enrich(
    fetcher: &dyn ContentFetcher,
    record: &BookmarkRecord,
    include_content: bool,
    policy: &RetryPolicy,
) -> Outcome {
    let mut enriched = EnrichedBookmark::from_record(record);

    if !include_content || record.url.is_empty() {
        return Outcome::Enriched(enriched);
    }

    let mut state = EnrichState::Pending;

    loop {
        state = state.begin_fetch();
        let EnrichState::Fetching { attempt } = state else {
            // Transitions above only ever produce Fetching here.
            return Outcome::Enriched(enriched);
        };
        debug!(url = %record.url, attempt, "enrichment attempt");

        let html = match fetcher.fetch(&record.url).await {
            Ok(html) => html,
            Err(err) => {
                let failure = EnrichmentFailure {
                    url: record.url.clone(),
                    name: record.name.clone(),
                    reason: err.to_string(),
                    kind: err.kind(),
                };
                warn!(url = %record.url, reason = %failure.reason, "fetch failed");

                return if err.is_access_family() {
                    Outcome::FailedStorable {
                        record: enriched,
                        failure,
                    }
                } else {
                    Outcome::Failed(failure)
                };
            }
        };

        state = state.begin_extract();
        let extraction = linkloom_extract::extract(&html);
        if !extraction.summary.is_empty() {
            enriched.summary = extraction.summary;
        }
        if !extraction.body_text.is_empty() {
            enriched.body_text = extraction.body_text;
        }

        let got_content = !enriched.summary.is_empty() || !enriched.body_text.is_empty();
        state = state.after_extract(got_content, policy);

        match state {
            EnrichState::Succeeded => {
                enriched.fetched_at = Utc::now();
                return Outcome::Enriched(enriched);
            }
            EnrichState::RetryScheduled { delay, .. } => {
                debug!(url = %record.url, ?delay, "extraction empty, retrying sequence");
                tokio::time::sleep(delay).await;
            }
            EnrichState::Failed => {
                return Outcome::Failed(EnrichmentFailure {
                    url: record.url.clone(),
                    name: record.name.clone(),
                    reason: EXTRACTION_EMPTY_REASON.to_string(),
                    kind: FailureKind::TransientExhausted,
                });
            }
            _ => unreachable!("after_extract only yields terminal or retry states"),
        }
    }
}
