//! Append-only JSONL logs: one self-contained JSON object per line, UTF-8,
//! no embedded newlines.
//!
//! [`JsonlRecordLog`] holds every enriched record; [`JsonlErrorLog`] holds
//! timestamped failure entries for the auditable failure family.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkloom_shared::{EnrichedBookmark, EnrichmentFailure, LinkloomError, Result};
use serde::{Deserialize, Serialize};

use crate::traits::{ErrorSink, RecordSink};

/// One line of the error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub url: String,
    pub name: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&EnrichmentFailure> for ErrorLogEntry {
    fn from(failure: &EnrichmentFailure) -> Self {
        Self {
            url: failure.url.clone(),
            name: failure.name.clone(),
            reason: failure.reason.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Append one serialized value as a JSONL line.
fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LinkloomError::io(parent, e))?;
    }

    let line = serde_json::to_string(value).map_err(|e| LinkloomError::Sink(e.to_string()))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LinkloomError::io(path, e))?;

    writeln!(file, "{line}").map_err(|e| LinkloomError::io(path, e))
}

/// Count non-blank lines in a JSONL file (0 when missing).
fn count_lines(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let content = std::fs::read_to_string(path).map_err(|e| LinkloomError::io(path, e))?;
    Ok(content.lines().filter(|l| !l.trim().is_empty()).count())
}

// ---------------------------------------------------------------------------
// Record log
// ---------------------------------------------------------------------------

/// Append-only JSONL log of enriched records.
pub struct JsonlRecordLog {
    path: PathBuf,
}

impl JsonlRecordLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Number of records in the log.
    pub fn count(&self) -> Result<usize> {
        count_lines(&self.path)
    }

    /// Read all records back, skipping unparseable lines.
    pub fn read_all(&self) -> Result<Vec<EnrichedBookmark>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| LinkloomError::io(&self.path, e))?;
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

#[async_trait]
impl RecordSink for JsonlRecordLog {
    async fn append(&self, record: &EnrichedBookmark) -> Result<()> {
        append_line(&self.path, record)
    }
}

// ---------------------------------------------------------------------------
// Error log
// ---------------------------------------------------------------------------

/// Append-only JSONL log of failures, with timestamps.
pub struct JsonlErrorLog {
    path: PathBuf,
}

impl JsonlErrorLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Number of entries in the log.
    pub fn count(&self) -> Result<usize> {
        count_lines(&self.path)
    }

    /// Read all entries back, skipping unparseable lines.
    pub fn read_all(&self) -> Result<Vec<ErrorLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| LinkloomError::io(&self.path, e))?;
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

#[async_trait]
impl ErrorSink for JsonlErrorLog {
    async fn append(&self, failure: &EnrichmentFailure) -> Result<()> {
        append_line(&self.path, &ErrorLogEntry::from(failure))
    }
}
