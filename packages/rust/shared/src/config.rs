//! Application configuration for Linkloom.
//!
//! User config lives at `~/.linkloom/linkloom.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LinkloomError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "linkloom.toml";

/// Default config/data directory name under the user's home.
const DATA_DIR_NAME: &str = ".linkloom";

// ---------------------------------------------------------------------------
// Config structs (matching linkloom.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Sink file locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Bookmark source selection.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum concurrent page fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Cap on records enriched per run after dedup (`<= 0` means unlimited).
    #[serde(default = "default_url_limit")]
    pub url_limit: i64,

    /// Whether to fetch page content at all.
    #[serde(default = "default_true")]
    pub include_content: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            url_limit: default_url_limit(),
            include_content: true,
        }
    }
}

fn default_concurrency() -> usize {
    10
}
fn default_url_limit() -> i64 {
    -1
}
fn default_true() -> bool {
    true
}

/// `[paths]` section. Relative paths resolve against `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root data directory (defaults to `~/.linkloom`).
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Document store database file.
    #[serde(default = "default_db")]
    pub db: String,

    /// Processed-URL ledger file.
    #[serde(default = "default_ledger")]
    pub ledger: String,

    /// Enriched-record JSONL log.
    #[serde(default = "default_record_log")]
    pub record_log: String,

    /// Failure JSONL log.
    #[serde(default = "default_error_log")]
    pub error_log: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db: default_db(),
            ledger: default_ledger(),
            record_log: default_record_log(),
            error_log: default_error_log(),
        }
    }
}

fn default_db() -> String {
    "linkloom.db".into()
}
fn default_ledger() -> String {
    "processed_urls.json".into()
}
fn default_record_log() -> String {
    "bookmarks.jsonl".into()
}
fn default_error_log() -> String {
    "errors.jsonl".into()
}

/// `[sources]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Browsers to ingest from.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    /// Custom bookmark file paths per browser, overriding auto-detection.
    #[serde(default)]
    pub custom_paths: BTreeMap<String, Vec<String>>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
            custom_paths: BTreeMap::new(),
        }
    }
}

fn default_browsers() -> Vec<String> {
    vec!["chrome".into(), "edge".into(), "firefox".into()]
}

// ---------------------------------------------------------------------------
// Resolved sink paths & enrichment options
// ---------------------------------------------------------------------------

/// Absolute sink locations resolved from [`PathsConfig`].
#[derive(Debug, Clone)]
pub struct SinkPaths {
    pub db: PathBuf,
    pub ledger: PathBuf,
    pub record_log: PathBuf,
    pub error_log: PathBuf,
}

impl AppConfig {
    /// Resolve the data directory: explicit config value or `~/.linkloom`.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.paths.data_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => config_dir(),
        }
    }

    /// Resolve all sink paths against the data directory.
    pub fn sink_paths(&self) -> Result<SinkPaths> {
        let data_dir = self.data_dir()?;
        let resolve = |p: &str| {
            let path = Path::new(p);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                data_dir.join(path)
            }
        };
        Ok(SinkPaths {
            db: resolve(&self.paths.db),
            ledger: resolve(&self.paths.ledger),
            record_log: resolve(&self.paths.record_log),
            error_log: resolve(&self.paths.error_log),
        })
    }
}

/// Runtime enrichment options — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Maximum in-flight fetches.
    pub concurrency: usize,
    /// Post-dedup cap on the working set (`<= 0` means unlimited).
    pub url_limit: i64,
    /// Whether to fetch page content.
    pub include_content: bool,
}

impl From<&AppConfig> for EnrichOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.concurrency,
            url_limit: config.defaults.url_limit,
            include_content: config.defaults.include_content,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config/data directory (`~/.linkloom/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LinkloomError::config("could not determine home directory"))?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Get the path to the config file (`~/.linkloom/linkloom.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LinkloomError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LinkloomError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LinkloomError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LinkloomError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LinkloomError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("concurrency"));
        assert!(toml_str.contains("processed_urls.json"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.concurrency, 10);
        assert_eq!(parsed.defaults.url_limit, -1);
        assert!(parsed.defaults.include_content);
    }

    #[test]
    fn config_with_custom_paths() {
        let toml_str = r#"
[defaults]
url_limit = 50

[paths]
data_dir = "/tmp/linkloom"
error_log = "/var/log/linkloom-errors.jsonl"

[sources]
browsers = ["chrome"]

[sources.custom_paths]
chrome = ["/tmp/Bookmarks"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.url_limit, 50);
        assert_eq!(config.sources.browsers, vec!["chrome".to_string()]);

        let paths = config.sink_paths().expect("resolve paths");
        assert_eq!(paths.db, PathBuf::from("/tmp/linkloom/linkloom.db"));
        // Absolute paths are kept as-is
        assert_eq!(
            paths.error_log,
            PathBuf::from("/var/log/linkloom-errors.jsonl")
        );
        assert_eq!(
            config.sources.custom_paths.get("chrome").map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn enrich_options_from_app_config() {
        let app = AppConfig::default();
        let opts = EnrichOptions::from(&app);
        assert_eq!(opts.concurrency, 10);
        assert_eq!(opts.url_limit, -1);
        assert!(opts.include_content);
    }
}
