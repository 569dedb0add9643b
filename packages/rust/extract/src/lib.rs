//! HTML content extraction: a short summary plus cleaned body text.
//!
//! Extraction is deliberately infallible — malformed HTML, empty documents,
//! and missing metadata all degrade to empty strings, never to errors. The
//! summary comes from a fallback chain over page metadata
//! ([`summary::extract_summary`]); the body text prefers readability-style
//! container extraction with a generic HTML-to-text conversion as fallback
//! ([`body::extract_body`]).

pub mod body;
pub mod summary;

use scraper::Html;

/// Maximum summary length, in characters.
pub const SUMMARY_MAX_CHARS: usize = 500;

/// Maximum length when the page title is used as a last-resort summary.
pub const TITLE_MAX_CHARS: usize = 200;

/// Maximum body text length, in characters.
pub const BODY_MAX_CHARS: usize = 5000;

/// Minimum length for a paragraph to count as a meaningful summary candidate.
pub const MIN_PARAGRAPH_CHARS: usize = 50;

/// Result of extracting content from an HTML page. Both fields may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Short description from page metadata (capped at [`SUMMARY_MAX_CHARS`]).
    pub summary: String,
    /// Cleaned main-content text (capped at [`BODY_MAX_CHARS`]).
    pub body_text: String,
}

impl Extraction {
    /// Whether neither a summary nor any body text was found.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.body_text.is_empty()
    }
}

/// Extract a summary/body-text pair from raw HTML.
pub fn extract(html: &str) -> Extraction {
    let doc = Html::parse_document(html);
    Extraction {
        summary: summary::extract_summary(&doc),
        body_text: body::extract_body(html, &doc),
    }
}

/// Truncate `text` to at most `max` characters, respecting char boundaries.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_combines_summary_and_body() {
        let html = r#"<html><head>
            <meta property="og:description" content="A concise description.">
            </head><body><main><p>Some long enough body paragraph with plenty of words in it.</p></main></body></html>"#;

        let result = extract(html);
        assert_eq!(result.summary, "A concise description.");
        assert!(result.body_text.contains("body paragraph"));
        assert!(!result.is_empty());
    }

    #[test]
    fn extract_never_panics_on_garbage() {
        for html in ["", "<<<>>>", "not html at all", "<html><body>"] {
            let result = extract(html);
            // Outputs may be empty, but extraction must not fail.
            assert!(result.summary.len() <= SUMMARY_MAX_CHARS * 4);
        }
    }

    #[test]
    fn truncate_respects_multibyte_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 4), "héll");
        assert_eq!(truncate_chars(text, 100), text);
    }
}
