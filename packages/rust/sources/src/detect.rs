//! Browser bookmark-file path discovery.
//!
//! Chromium-family browsers keep a `Bookmarks` JSON file per profile under a
//! per-OS application-data directory; this module probes the standard
//! locations. Firefox has no JSON file — it is ingested via its Netscape
//! HTML export, configured as a custom path.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

/// Chromium profile directories worth probing.
const PROFILE_DIRS: &[&str] = &["Default", "Profile 1", "Profile 2", "Profile 3"];

/// A bookmark source with the files it should be read from.
#[derive(Debug, Clone)]
pub struct SourceFiles {
    /// Source name (e.g., `"chrome"`).
    pub source: String,
    /// Bookmark files to parse for this source.
    pub paths: Vec<PathBuf>,
}

/// Detect bookmark file paths for one browser on this machine.
pub fn detect_bookmark_paths(browser: &str) -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        debug!("no home directory, skipping detection");
        return Vec::new();
    };

    let bases: Vec<PathBuf> = match browser {
        "chrome" => {
            if cfg!(target_os = "windows") {
                vec![home.join("AppData/Local/Google/Chrome/User Data")]
            } else if cfg!(target_os = "macos") {
                vec![home.join("Library/Application Support/Google/Chrome")]
            } else {
                vec![home.join(".config/google-chrome")]
            }
        }
        "edge" => {
            if cfg!(target_os = "windows") {
                vec![home.join("AppData/Local/Microsoft/Edge/User Data")]
            } else if cfg!(target_os = "macos") {
                vec![home.join("Library/Application Support/Microsoft Edge")]
            } else {
                vec![home.join(".config/microsoft-edge")]
            }
        }
        "brave" => {
            if cfg!(target_os = "windows") {
                vec![home.join("AppData/Local/BraveSoftware/Brave-Browser/User Data")]
            } else if cfg!(target_os = "macos") {
                vec![home.join("Library/Application Support/BraveSoftware/Brave-Browser")]
            } else {
                vec![home.join(".config/BraveSoftware/Brave-Browser")]
            }
        }
        "opera" => {
            // Opera keeps its Bookmarks file at the profile root.
            let base = if cfg!(target_os = "windows") {
                home.join("AppData/Roaming/Opera Software/Opera Stable")
            } else if cfg!(target_os = "macos") {
                home.join("Library/Application Support/com.operasoftware.Opera")
            } else {
                home.join(".config/opera")
            };
            let path = base.join("Bookmarks");
            return if path.exists() {
                info!(?path, "found bookmark file");
                vec![path]
            } else {
                Vec::new()
            };
        }
        other => {
            debug!(browser = other, "no auto-detection for this source");
            return Vec::new();
        }
    };

    let mut paths = Vec::new();
    for base in bases {
        if !base.exists() {
            debug!(?base, "base path does not exist");
            continue;
        }
        for profile in PROFILE_DIRS {
            let path = base.join(profile).join("Bookmarks");
            if path.exists() {
                info!(?path, "found bookmark file");
                paths.push(path);
            }
        }
    }
    paths
}

/// Resolve the configured browsers to concrete bookmark files.
///
/// Custom paths take precedence over auto-detection; browsers with neither
/// are omitted.
pub fn available_sources(
    browsers: &[String],
    custom_paths: &BTreeMap<String, Vec<String>>,
) -> Vec<SourceFiles> {
    let mut sources = Vec::new();

    for browser in browsers {
        let paths: Vec<PathBuf> = match custom_paths.get(browser) {
            Some(custom) => custom.iter().map(PathBuf::from).collect(),
            None => detect_bookmark_paths(browser),
        };

        if paths.is_empty() {
            debug!(browser, "no bookmark files found");
            continue;
        }

        sources.push(SourceFiles {
            source: browser.clone(),
            paths,
        });
    }

    sources
}
