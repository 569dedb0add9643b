//! SQL migration definitions for the Linkloom database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: bookmarks",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Enriched bookmark records. `id` is the sha256 digest of "url:source",
-- so upserts are idempotent across runs and restarts.
CREATE TABLE IF NOT EXISTS bookmarks (
    id         TEXT PRIMARY KEY,
    url        TEXT NOT NULL,
    source     TEXT NOT NULL,
    name       TEXT NOT NULL,
    folder     TEXT NOT NULL DEFAULT '',
    summary    TEXT NOT NULL DEFAULT '',
    body_text  TEXT NOT NULL DEFAULT '',
    fetched_at TEXT NOT NULL,
    UNIQUE(url, source)
);

CREATE INDEX IF NOT EXISTS idx_bookmarks_url ON bookmarks(url);
CREATE INDEX IF NOT EXISTS idx_bookmarks_source ON bookmarks(source);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
