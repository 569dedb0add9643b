//! Result routing: fan outcomes out to the sinks.
//!
//! Every storable record goes to the record log and the document store, and
//! its URL reaches the ledger only after (and only if) the store write
//! succeeded — a crash between the two leaves the record eligible for
//! reprocessing, never silently lost. Failures in the auth/not-found family
//! are appended to the error log; everything else is only logged. A write
//! failure in one sink never prevents the other sinks or later records.

use linkloom_shared::{EnrichedBookmark, EnrichmentFailure};
use linkloom_store::{DocumentStore, ErrorSink, RecordSink, UrlLedger};
use tracing::{info, warn};

use crate::worker::Outcome;

/// Counts from routing one batch of outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouteReport {
    /// Records upserted into the document store.
    pub stored: usize,
    /// Records appended to the record log.
    pub recorded: usize,
    /// URLs added to the processed-URL ledger.
    pub ledgered: usize,
    /// Failures appended to the error log.
    pub errors_logged: usize,
    /// Sink write failures that were caught and skipped.
    pub sink_errors: usize,
}

/// Write a batch of outcomes to the sinks.
pub async fn route_outcomes(
    outcomes: &[Outcome],
    store: &dyn DocumentStore,
    ledger: &dyn UrlLedger,
    record_log: &dyn RecordSink,
    error_log: &dyn ErrorSink,
) -> RouteReport {
    let mut report = RouteReport::default();

    let mut storable: Vec<EnrichedBookmark> = Vec::new();
    let mut auditable: Vec<&EnrichmentFailure> = Vec::new();

    for outcome in outcomes {
        match outcome {
            Outcome::Enriched(record) => storable.push(record.clone()),
            Outcome::FailedStorable { record, failure } => {
                storable.push(record.clone());
                auditable.push(failure);
            }
            Outcome::Failed(failure) => {
                warn!(
                    url = %failure.url,
                    reason = %failure.reason,
                    kind = ?failure.kind,
                    "enrichment failed"
                );
            }
        }
    }

    // Record log first: per-record, isolated from the store path.
    for record in &storable {
        match record_log.append(record).await {
            Ok(()) => report.recorded += 1,
            Err(e) => {
                warn!(url = %record.url, error = %e, "record log write failed");
                report.sink_errors += 1;
            }
        }
    }

    // Store, then ledger — never the other way around.
    if !storable.is_empty() {
        let ledger_urls = match store.upsert_batch(&storable).await {
            Ok(count) if count == storable.len() => {
                report.stored = count;
                storable.iter().map(|r| r.url.clone()).collect()
            }
            Ok(count) => {
                warn!(
                    stored = count,
                    expected = storable.len(),
                    "partial upsert, attributing per record"
                );
                attribute_upserts(&storable, store, &mut report).await
            }
            Err(e) => {
                warn!(error = %e, "store upsert failed, ledger untouched");
                report.sink_errors += 1;
                Vec::new()
            }
        };

        if !ledger_urls.is_empty() {
            match ledger.add_many(&ledger_urls).await {
                Ok(()) => report.ledgered = ledger_urls.len(),
                Err(e) => {
                    warn!(error = %e, "ledger write failed");
                    report.sink_errors += 1;
                }
            }
        }
    }

    for failure in auditable {
        match error_log.append(failure).await {
            Ok(()) => report.errors_logged += 1,
            Err(e) => {
                warn!(url = %failure.url, error = %e, "error log write failed");
                report.sink_errors += 1;
            }
        }
    }

    info!(
        stored = report.stored,
        recorded = report.recorded,
        ledgered = report.ledgered,
        errors_logged = report.errors_logged,
        sink_errors = report.sink_errors,
        "routing complete"
    );

    report
}

/// A batch upsert reported partial success, and the count alone cannot say
/// which records made it. Re-run each record individually (upserts are
/// idempotent) so the ledger only gains URLs whose store write succeeded.
async fn attribute_upserts(
    storable: &[EnrichedBookmark],
    store: &dyn DocumentStore,
    report: &mut RouteReport,
) -> Vec<String> {
    let mut urls = Vec::new();
    for record in storable {
        match store.upsert_batch(std::slice::from_ref(record)).await {
            Ok(1) => {
                report.stored += 1;
                urls.push(record.url.clone());
            }
            Ok(_) => {
                warn!(url = %record.url, "record upsert did not stick");
            }
            Err(e) => {
                warn!(url = %record.url, error = %e, "record upsert failed");
                report.sink_errors += 1;
            }
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        MockErrorLog, MockLedger, MockRecordLog, MockStore, enriched, failure_storable, failed,
    };

    #[tokio::test]
    async fn success_reaches_all_three_success_sinks() {
        let store = MockStore::default();
        let ledger = MockLedger::default();
        let record_log = MockRecordLog::default();
        let error_log = MockErrorLog::default();

        let outcomes = vec![
            enriched("https://example.com/a", "Summary A"),
            enriched("https://example.com/b", "Summary B"),
        ];

        let report = route_outcomes(&outcomes, &store, &ledger, &record_log, &error_log).await;

        assert_eq!(report.stored, 2);
        assert_eq!(report.recorded, 2);
        assert_eq!(report.ledgered, 2);
        assert_eq!(report.errors_logged, 0);
        assert_eq!(report.sink_errors, 0);
        assert!(ledger.contains("https://example.com/a"));
        assert_eq!(record_log.entries().len(), 2);
        assert!(error_log.entries().is_empty());
    }

    #[tokio::test]
    async fn dual_emit_stores_placeholder_and_logs_error() {
        let store = MockStore::default();
        let ledger = MockLedger::default();
        let record_log = MockRecordLog::default();
        let error_log = MockErrorLog::default();

        let outcomes = vec![failure_storable(
            "https://example.com/private",
            "authentication required or access denied",
        )];

        let report = route_outcomes(&outcomes, &store, &ledger, &record_log, &error_log).await;

        assert_eq!(report.stored, 1);
        assert_eq!(report.errors_logged, 1);
        assert!(ledger.contains("https://example.com/private"));
        assert_eq!(error_log.entries().len(), 1);
        assert!(error_log.entries()[0].reason.contains("access denied"));
    }

    #[tokio::test]
    async fn plain_failures_are_not_persisted() {
        let store = MockStore::default();
        let ledger = MockLedger::default();
        let record_log = MockRecordLog::default();
        let error_log = MockErrorLog::default();

        let outcomes = vec![failed("https://example.com/down", "HTTP 503 error")];

        let report = route_outcomes(&outcomes, &store, &ledger, &record_log, &error_log).await;

        assert_eq!(report.stored, 0);
        assert_eq!(report.errors_logged, 0);
        assert_eq!(store.len(), 0);
        assert!(error_log.entries().is_empty());
        assert!(!ledger.contains("https://example.com/down"));
    }

    #[tokio::test]
    async fn record_log_failure_does_not_block_store_or_ledger() {
        let store = MockStore::default();
        let ledger = MockLedger::default();
        let record_log = MockRecordLog::failing();
        let error_log = MockErrorLog::default();

        let outcomes = vec![enriched("https://example.com/a", "Summary A")];

        let report = route_outcomes(&outcomes, &store, &ledger, &record_log, &error_log).await;

        assert_eq!(report.recorded, 0);
        assert_eq!(report.sink_errors, 1);
        // The other sinks still ran
        assert_eq!(report.stored, 1);
        assert_eq!(report.ledgered, 1);
    }

    #[tokio::test]
    async fn store_failure_keeps_ledger_untouched() {
        let store = MockStore::failing();
        let ledger = MockLedger::default();
        let record_log = MockRecordLog::default();
        let error_log = MockErrorLog::default();

        let outcomes = vec![enriched("https://example.com/a", "Summary A")];

        let report = route_outcomes(&outcomes, &store, &ledger, &record_log, &error_log).await;

        assert_eq!(report.stored, 0);
        assert_eq!(report.ledgered, 0);
        assert!(!ledger.contains("https://example.com/a"));
        assert!(report.sink_errors >= 1);
        // Record log ran before the store and is unaffected
        assert_eq!(report.recorded, 1);
    }

    #[tokio::test]
    async fn partial_upsert_ledgers_only_successes() {
        let store = MockStore::default();
        store.fail_url("https://example.com/bad");
        let ledger = MockLedger::default();
        let record_log = MockRecordLog::default();
        let error_log = MockErrorLog::default();

        let outcomes = vec![
            enriched("https://example.com/good", "Summary good"),
            enriched("https://example.com/bad", "Summary bad"),
        ];

        let report = route_outcomes(&outcomes, &store, &ledger, &record_log, &error_log).await;

        assert_eq!(report.stored, 1);
        assert_eq!(report.ledgered, 1);
        assert!(ledger.contains("https://example.com/good"));
        assert!(!ledger.contains("https://example.com/bad"));
    }

    #[tokio::test]
    async fn ledger_failure_is_counted_not_fatal() {
        let store = MockStore::default();
        let ledger = MockLedger::failing();
        let record_log = MockRecordLog::default();
        let error_log = MockErrorLog::default();

        let outcomes = vec![enriched("https://example.com/a", "Summary A")];

        let report = route_outcomes(&outcomes, &store, &ledger, &record_log, &error_log).await;

        assert_eq!(report.stored, 1);
        assert_eq!(report.ledgered, 0);
        assert_eq!(report.sink_errors, 1);
    }
}
