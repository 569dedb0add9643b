//! Bounded-concurrency scheduling of enrichment workers.
//!
//! A semaphore admits at most N workers into the in-flight state at once.
//! Outcomes are collected positionally, so the returned list is in input
//! order even though completion order is unconstrained. A cancellation
//! token lets the caller stop a batch: in-flight workers finish naturally,
//! never-started ones are discarded without producing outcomes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use linkloom_shared::BookmarkRecord;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::fetcher::ContentFetcher;
use crate::worker::{self, Outcome, RetryPolicy};

// ---------------------------------------------------------------------------
// Cancellation & progress
// ---------------------------------------------------------------------------

/// Cooperative whole-batch cancellation flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. In-flight work finishes; queued work is dropped.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress callback for batch runs.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after every completed record.
    fn record_done(&self, completed: usize, total: usize, url: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_done(&self, _completed: usize, _total: usize, _url: &str) {}
}

// ---------------------------------------------------------------------------
// Batch runner
// ---------------------------------------------------------------------------

/// Result of running a batch of workers.
#[derive(Debug)]
pub struct ScheduledBatch {
    /// One outcome per processed record, in input order.
    pub outcomes: Vec<Outcome>,
    /// Records discarded because the batch was cancelled before they started.
    pub discarded: usize,
}

/// Run `enrich` over the whole working set under a concurrency bound.
pub async fn run_batch(
    fetcher: Arc<dyn ContentFetcher>,
    records: Vec<BookmarkRecord>,
    include_content: bool,
    policy: RetryPolicy,
    concurrency: usize,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancelToken,
) -> ScheduledBatch {
    let total = records.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let completed = Arc::new(AtomicUsize::new(0));

    info!(total, concurrency, include_content, "scheduling batch");

    let mut handles = Vec::with_capacity(total);
    for (idx, record) in records.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let fetcher = fetcher.clone();
        let policy = policy.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        let completed = completed.clone();

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (idx, None);
            };
            if cancel.is_cancelled() {
                return (idx, None);
            }

            let outcome = worker::enrich(fetcher.as_ref(), &record, include_content, &policy).await;

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress.record_done(done, total, &record.url);

            (idx, Some(outcome))
        }));
    }

    // Positional collection: completion order is unconstrained, output order
    // is input order.
    let mut slots: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();
    let mut discarded = 0;

    for handle in handles {
        match handle.await {
            Ok((idx, Some(outcome))) => slots[idx] = Some(outcome),
            Ok((_, None)) => discarded += 1,
            Err(e) => {
                warn!(error = %e, "enrichment task failed to join");
                discarded += 1;
            }
        }
    }

    let outcomes: Vec<Outcome> = slots.into_iter().flatten().collect();

    info!(
        completed = outcomes.len(),
        discarded, "batch scheduling complete"
    );

    ScheduledBatch {
        outcomes,
        discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFetcher, record};
    use std::time::Duration;

    const PAGE: &str = r#"<html><head>
        <meta name="description" content="Scheduled page description.">
        </head><body></body></html>"#;

    fn slow_fetcher(urls: &[String], delay: Duration) -> MockFetcher {
        let mut fetcher = MockFetcher::default().with_delay(delay);
        for url in urls {
            fetcher = fetcher.ok(url, PAGE);
        }
        fetcher
    }

    #[tokio::test]
    async fn outcomes_preserve_input_order() {
        let urls: Vec<String> = (0..8).map(|i| format!("https://example.com/{i}")).collect();
        let fetcher = slow_fetcher(&urls, Duration::from_millis(5));
        let records = urls.iter().map(|u| record(u)).collect();

        let batch = run_batch(
            Arc::new(fetcher),
            records,
            true,
            RetryPolicy::default(),
            3,
            Arc::new(SilentProgress),
            CancelToken::new(),
        )
        .await;

        assert_eq!(batch.outcomes.len(), 8);
        assert_eq!(batch.discarded, 0);
        for (i, outcome) in batch.outcomes.iter().enumerate() {
            assert_eq!(outcome.url(), format!("https://example.com/{i}"));
        }
    }

    #[tokio::test]
    async fn concurrency_bound_is_respected() {
        let urls: Vec<String> = (0..5).map(|i| format!("https://example.com/{i}")).collect();
        let fetcher = slow_fetcher(&urls, Duration::from_millis(30));
        let records = urls.iter().map(|u| record(u)).collect();
        let fetcher = Arc::new(fetcher);

        let batch = run_batch(
            fetcher.clone(),
            records,
            true,
            RetryPolicy::default(),
            2,
            Arc::new(SilentProgress),
            CancelToken::new(),
        )
        .await;

        assert_eq!(batch.outcomes.len(), 5);
        assert!(
            fetcher.max_in_flight() <= 2,
            "observed {} fetches in flight",
            fetcher.max_in_flight()
        );
    }

    #[tokio::test]
    async fn progress_counter_reaches_total() {
        struct CountingProgress(AtomicUsize);
        impl ProgressReporter for CountingProgress {
            fn phase(&self, _name: &str) {}
            fn record_done(&self, completed: usize, total: usize, _url: &str) {
                assert!(completed <= total);
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let urls: Vec<String> = (0..4).map(|i| format!("https://example.com/{i}")).collect();
        let fetcher = slow_fetcher(&urls, Duration::from_millis(1));
        let records = urls.iter().map(|u| record(u)).collect();
        let progress = Arc::new(CountingProgress(AtomicUsize::new(0)));

        run_batch(
            Arc::new(fetcher),
            records,
            true,
            RetryPolicy::default(),
            4,
            progress.clone(),
            CancelToken::new(),
        )
        .await;

        assert_eq!(progress.0.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn cancellation_discards_not_yet_started() {
        let urls: Vec<String> = (0..6).map(|i| format!("https://example.com/{i}")).collect();
        let fetcher = slow_fetcher(&urls, Duration::from_millis(150));
        let records = urls.iter().map(|u| record(u)).collect();

        let cancel = CancelToken::new();
        // Concurrency 1 serializes the queue; cancel while the first record
        // is still in flight.
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            cancel_clone.cancel();
        });

        let batch = run_batch(
            Arc::new(fetcher),
            records,
            true,
            RetryPolicy::default(),
            1,
            Arc::new(SilentProgress),
            cancel,
        )
        .await;

        // At least the first record completes naturally; later ones are
        // discarded, and every record is accounted for one way or the other.
        assert!(!batch.outcomes.is_empty());
        assert!(batch.discarded > 0);
        assert_eq!(batch.outcomes.len() + batch.discarded, 6);
    }

    #[tokio::test]
    async fn empty_batch_completes() {
        let batch = run_batch(
            Arc::new(MockFetcher::default()),
            Vec::new(),
            true,
            RetryPolicy::default(),
            4,
            Arc::new(SilentProgress),
            CancelToken::new(),
        )
        .await;

        assert!(batch.outcomes.is_empty());
        assert_eq!(batch.discarded, 0);
    }
}
