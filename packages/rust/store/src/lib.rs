//! Sink implementations for the enrichment pipeline.
//!
//! - [`BookmarkStore`] — libSQL document store keyed by the `(url, source)`
//!   digest, with versioned migrations applied on open.
//! - [`JsonUrlLedger`] — JSON-file set of processed URLs.
//! - [`JsonlRecordLog`] / [`JsonlErrorLog`] — append-only JSONL logs.
//!
//! The pipeline consumes all of these through the trait contracts in
//! [`traits`].

pub mod ledger;
pub mod logs;
mod migrations;
pub mod traits;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use linkloom_shared::{EnrichedBookmark, LinkloomError, Result, record_id};
use tracing::warn;

pub use ledger::JsonUrlLedger;
pub use logs::{ErrorLogEntry, JsonlErrorLog, JsonlRecordLog};
pub use traits::{DocumentStore, ErrorSink, RecordSink, UrlLedger};

/// Primary document store wrapping a libSQL database.
pub struct BookmarkStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl BookmarkStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LinkloomError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LinkloomError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LinkloomError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    LinkloomError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Upsert a single record (insert or replace by identity digest).
    pub async fn upsert(&self, record: &EnrichedBookmark) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO bookmarks (id, url, source, name, folder, summary, body_text, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   folder = excluded.folder,
                   summary = excluded.summary,
                   body_text = excluded.body_text,
                   fetched_at = excluded.fetched_at",
                params![
                    record.id(),
                    record.url.as_str(),
                    record.source.as_str(),
                    record.name.as_str(),
                    record.folder.as_str(),
                    record.summary.as_str(),
                    record.body_text.as_str(),
                    record.fetched_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| LinkloomError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a record by its identity digest.
    pub async fn get(&self, id: &str) -> Result<Option<EnrichedBookmark>> {
        let mut rows = self
            .conn
            .query(
                "SELECT url, source, name, folder, summary, body_text, fetched_at
                 FROM bookmarks WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| LinkloomError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(LinkloomError::Storage(e.to_string())),
        }
    }

    /// Total number of stored records.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM bookmarks", params![])
            .await
            .map_err(|e| LinkloomError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|n| n.max(0) as u64)
                .map_err(|e| LinkloomError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(LinkloomError::Storage(e.to_string())),
        }
    }
}

#[async_trait]
impl DocumentStore for BookmarkStore {
    async fn existing(&self, url: &str, source: &str) -> Result<Option<EnrichedBookmark>> {
        self.get(&record_id(url, source)).await
    }

    async fn upsert_batch(&self, records: &[EnrichedBookmark]) -> Result<usize> {
        let mut stored = 0;
        for record in records {
            match self.upsert(record).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    warn!(url = %record.url, error = %e, "record upsert failed");
                }
            }
        }
        Ok(stored)
    }
}

/// Convert a database row to an [`EnrichedBookmark`].
fn row_to_record(row: &libsql::Row) -> Result<EnrichedBookmark> {
    let get_text = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| LinkloomError::Storage(e.to_string()))
    };

    Ok(EnrichedBookmark {
        url: get_text(0)?,
        source: get_text(1)?,
        name: get_text(2)?,
        folder: get_text(3)?,
        summary: get_text(4)?,
        body_text: get_text(5)?,
        fetched_at: {
            let s = get_text(6)?;
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| LinkloomError::Storage(format!("invalid date: {e}")))?
        },
    })
}


#[cfg(test)]
mod tests {
    use super::test_util::temp_path;
    use super::*;
    use linkloom_shared::BookmarkRecord;

    async fn test_store() -> BookmarkStore {
        BookmarkStore::open(&temp_path("store.db"))
            .await
            .expect("open test db")
    }

    fn record(url: &str, source: &str, summary: &str) -> EnrichedBookmark {
        let mut r = EnrichedBookmark::from_record(&BookmarkRecord {
            url: url.into(),
            name: "Test".into(),
            folder: "bar".into(),
            source: source.into(),
        });
        r.summary = summary.into();
        r
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let path = temp_path("reopen.db");
        let first = BookmarkStore::open(&path).await.expect("first open");
        drop(first);
        let second = BookmarkStore::open(&path).await.expect("second open");
        assert_eq!(second.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn upsert_and_lookup() {
        let store = test_store().await;
        let rec = record("https://example.com/a", "chrome", "A summary");

        store.upsert(&rec).await.expect("upsert");

        let found = store
            .existing("https://example.com/a", "chrome")
            .await
            .expect("existing")
            .expect("present");
        assert_eq!(found.summary, "A summary");
        assert_eq!(found.folder, "bar");

        // Same URL under a different source is a different record
        let missing = store
            .existing("https://example.com/a", "firefox")
            .await
            .expect("existing");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record() {
        let store = test_store().await;
        store
            .upsert(&record("https://example.com/a", "chrome", "old"))
            .await
            .unwrap();
        store
            .upsert(&record("https://example.com/a", "chrome", "new"))
            .await
            .unwrap();

        let found = store
            .existing("https://example.com/a", "chrome")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.summary, "new");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_batch_counts_successes() {
        let store = test_store().await;
        let batch = vec![
            record("https://example.com/a", "chrome", "one"),
            record("https://example.com/b", "chrome", "two"),
            record("https://example.com/c", "edge", "three"),
        ];

        let stored = store.upsert_batch(&batch).await.expect("upsert batch");
        assert_eq!(stored, 3);
        assert_eq!(store.count().await.unwrap(), 3);
    }
}
