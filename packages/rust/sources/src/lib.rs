//! Bookmark source discovery and file parsing.
//!
//! This crate hands the enrichment pipeline its candidate batches: it knows
//! where browsers keep their bookmark files ([`detect`]) and how to parse
//! the two supported formats ([`parser`]) — the Chromium `Bookmarks` JSON
//! tree and the Netscape bookmark-export HTML used by Firefox exports.

pub mod detect;
pub mod parser;

use std::path::Path;

use linkloom_shared::{BookmarkRecord, Result};
use tracing::warn;

pub use detect::{SourceFiles, available_sources, detect_bookmark_paths};
pub use parser::{parse_chromium_json, parse_netscape_html};

/// Parse one bookmark file, choosing the parser from the file extension.
///
/// A missing file is not an error: it yields an empty list with a warning,
/// since browser profiles come and go between runs.
pub fn parse_bookmark_file(path: &Path, source: &str) -> Result<Vec<BookmarkRecord>> {
    if !path.exists() {
        warn!(?path, source, "bookmark file does not exist, skipping");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| linkloom_shared::LinkloomError::io(path, e))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "html" | "htm" => parse_netscape_html(&content, source),
        _ => parse_chromium_json(&content, source),
    }
}
