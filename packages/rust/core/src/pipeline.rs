//! The enrichment pipeline: gate → schedule → route.
//!
//! [`Pipeline::enrich_batch`] is the single entry point. It owns no sink
//! state — the document store, ledger, and logs are injected as trait
//! handles whose lifecycle belongs to the caller. No failure path escapes
//! as an error: a batch always completes and reports its counts, even when
//! every fetch fails.

use std::sync::Arc;

use linkloom_shared::{BookmarkRecord, EnrichedBookmark, EnrichmentFailure};
use linkloom_store::{DocumentStore, ErrorSink, RecordSink, UrlLedger};
use tracing::{info, instrument};

use crate::fetcher::ContentFetcher;
use crate::gate::{self, SkippedBookmark};
use crate::router;
use crate::scheduler::{self, CancelToken, ProgressReporter, SilentProgress};
use crate::worker::RetryPolicy;

/// Result of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Successfully enriched records (including dual-emit placeholders),
    /// in working-set order.
    pub enriched: Vec<EnrichedBookmark>,
    /// Definitive failures for this run, in working-set order.
    pub failures: Vec<EnrichmentFailure>,
    /// Candidates the dedup gate excluded.
    pub skipped: Vec<SkippedBookmark>,
    /// Records upserted into the document store.
    pub stored: usize,
    /// Failures appended to the error log.
    pub errors_logged: usize,
    /// Sink write failures that were caught and skipped.
    pub sink_errors: usize,
    /// Working-set records discarded by cancellation before starting.
    pub discarded: usize,
}

/// The concurrent enrichment pipeline with injected collaborators.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<dyn UrlLedger>,
    record_log: Arc<dyn RecordSink>,
    error_log: Arc<dyn ErrorSink>,
    fetcher: Arc<dyn ContentFetcher>,
    policy: RetryPolicy,
    url_limit: i64,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancelToken,
}

impl Pipeline {
    /// Build a pipeline over caller-owned sinks and fetcher.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ledger: Arc<dyn UrlLedger>,
        record_log: Arc<dyn RecordSink>,
        error_log: Arc<dyn ErrorSink>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            store,
            ledger,
            record_log,
            error_log,
            fetcher,
            policy: RetryPolicy::default(),
            url_limit: -1,
            progress: Arc::new(SilentProgress),
            cancel: CancelToken::new(),
        }
    }

    /// Override the enrichment retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap the working set after dedup (`<= 0` means unlimited).
    pub fn with_url_limit(mut self, limit: i64) -> Self {
        self.url_limit = limit;
        self
    }

    /// Attach a progress reporter.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Attach an external cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enrich a candidate batch.
    ///
    /// Dedups against the ledger and store, runs fetch+extract workers under
    /// `concurrency`, and fans results out to the sinks. Returns the full
    /// report; never an error.
    #[instrument(skip_all, fields(candidates = candidates.len(), concurrency))]
    pub async fn enrich_batch(
        &self,
        candidates: Vec<BookmarkRecord>,
        include_content: bool,
        concurrency: usize,
    ) -> BatchReport {
        self.progress.phase("Deduplicating candidates");
        let gate_outcome = gate::filter_candidates(
            candidates,
            self.store.as_ref(),
            self.ledger.as_ref(),
            self.url_limit,
        )
        .await;

        let working = gate_outcome.working_set.len();

        self.progress.phase("Enriching bookmarks");
        let scheduled = scheduler::run_batch(
            self.fetcher.clone(),
            gate_outcome.working_set,
            include_content,
            self.policy.clone(),
            concurrency,
            self.progress.clone(),
            self.cancel.clone(),
        )
        .await;

        self.progress.phase("Writing results");
        let route = router::route_outcomes(
            &scheduled.outcomes,
            self.store.as_ref(),
            self.ledger.as_ref(),
            self.record_log.as_ref(),
            self.error_log.as_ref(),
        )
        .await;

        let mut enriched = Vec::new();
        let mut failures = Vec::new();
        for outcome in &scheduled.outcomes {
            if let Some(record) = outcome.record() {
                enriched.push(record.clone());
            }
            if let Some(failure) = outcome.failure() {
                failures.push(failure.clone());
            }
        }

        info!(
            working,
            enriched = enriched.len(),
            failures = failures.len(),
            skipped = gate_outcome.skipped.len(),
            stored = route.stored,
            errors_logged = route.errors_logged,
            sink_errors = route.sink_errors,
            discarded = scheduled.discarded,
            "batch complete"
        );

        BatchReport {
            enriched,
            failures,
            skipped: gate_outcome.skipped,
            stored: route.stored,
            errors_logged: route.errors_logged,
            sink_errors: route.sink_errors,
            discarded: scheduled.discarded,
        }
    }
}
