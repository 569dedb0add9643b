//! JSON-file ledger of processed URLs.
//!
//! The ledger is the cross-run memory that keeps already-enriched URLs from
//! being fetched again, independent of document-store state. On disk it is a
//! sorted JSON array of URLs; in memory it is a hash set guarded by a mutex
//! (mutations happen on the single routing path, but the trait contract
//! allows concurrent callers).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use linkloom_shared::{LinkloomError, Result};
use tracing::warn;

use crate::traits::UrlLedger;

/// File-backed processed-URL ledger.
pub struct JsonUrlLedger {
    path: PathBuf,
    urls: Mutex<HashSet<String>>,
}

impl JsonUrlLedger {
    /// Open a ledger at `path`. A missing file starts an empty ledger.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LinkloomError::io(parent, e))?;
        }

        let urls = if path.exists() {
            load_urls(path)?
        } else {
            HashSet::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            urls: Mutex::new(urls),
        })
    }

    /// Number of URLs in the ledger.
    pub fn len(&self) -> usize {
        self.urls.lock().expect("ledger lock poisoned").len()
    }

    /// Whether the ledger holds no URLs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All URLs, sorted (the on-disk order).
    pub fn all(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .urls
            .lock()
            .expect("ledger lock poisoned")
            .iter()
            .cloned()
            .collect();
        urls.sort();
        urls
    }

    /// Persist the current set as a sorted JSON array.
    fn save(&self) -> Result<()> {
        let urls = self.all();
        let json = serde_json::to_string_pretty(&urls)
            .map_err(|e| LinkloomError::Sink(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| LinkloomError::io(&self.path, e))
    }
}

/// Load URLs from disk, accepting either a bare array or `{"urls": [...]}`.
fn load_urls(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| LinkloomError::io(path, e))?;

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(serde_json::Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()),
        Ok(serde_json::Value::Object(map)) => match map.get("urls").and_then(|v| v.as_array()) {
            Some(items) => Ok(items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()),
            None => {
                warn!(?path, "unexpected ledger layout, starting fresh");
                Ok(HashSet::new())
            }
        },
        _ => {
            warn!(?path, "unreadable ledger file, starting fresh");
            Ok(HashSet::new())
        }
    }
}

#[async_trait]
impl UrlLedger for JsonUrlLedger {
    async fn is_processed(&self, url: &str) -> Result<bool> {
        Ok(self
            .urls
            .lock()
            .expect("ledger lock poisoned")
            .contains(url))
    }

    async fn add_many(&self, urls: &[String]) -> Result<()> {
        let changed = {
            let mut set = self.urls.lock().expect("ledger lock poisoned");
            let before = set.len();
            set.extend(urls.iter().filter(|u| !u.is_empty()).cloned());
            set.len() != before
        };

        if changed {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::temp_path;

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let ledger = JsonUrlLedger::open(&temp_path("ledger.json")).expect("open");
        assert!(ledger.is_empty());
        assert!(!ledger.is_processed("https://example.com").await.unwrap());
    }

    #[tokio::test]
    async fn add_many_persists_and_reloads() {
        let path = temp_path("ledger_reload.json");
        {
            let ledger = JsonUrlLedger::open(&path).expect("open");
            ledger
                .add_many(&[
                    "https://example.com/b".to_string(),
                    "https://example.com/a".to_string(),
                ])
                .await
                .expect("add");
        }

        let reloaded = JsonUrlLedger::open(&path).expect("reopen");
        assert_eq!(reloaded.len(), 2);
        assert!(
            reloaded
                .is_processed("https://example.com/a")
                .await
                .unwrap()
        );
        // Sorted on disk
        assert_eq!(
            reloaded.all(),
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn duplicates_and_empty_urls_are_ignored() {
        let ledger = JsonUrlLedger::open(&temp_path("ledger_dup.json")).expect("open");
        ledger
            .add_many(&[
                "https://example.com".to_string(),
                "https://example.com".to_string(),
                String::new(),
            ])
            .await
            .expect("add");
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn accepts_wrapped_object_layout() {
        let path = temp_path("ledger_wrapped.json");
        std::fs::write(&path, r#"{"urls": ["https://example.com/x"]}"#).unwrap();

        let ledger = JsonUrlLedger::open(&path).expect("open");
        assert!(
            ledger
                .is_processed("https://example.com/x")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn corrupt_file_starts_fresh() {
        let path = temp_path("ledger_corrupt.json");
        std::fs::write(&path, "{not json").unwrap();

        let ledger = JsonUrlLedger::open(&path).expect("open");
        assert!(ledger.is_empty());
    }
}
