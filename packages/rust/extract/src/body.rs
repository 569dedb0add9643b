//! Body-text extraction: readability-style container text with a generic
//! HTML-to-text fallback.
//!
//! The primary pass walks the first main-content container it finds and
//! collects text, keeping tables and dropping navigation chrome and
//! script/style subtrees (comments are not text nodes and fall away on
//! their own). When that yields nothing, the whole document is converted
//! through `htmd` with non-content tags stripped.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{BODY_MAX_CHARS, truncate_chars};

/// Marker appended when body text is cut at [`BODY_MAX_CHARS`].
const TRUNCATION_MARKER: &str = "...";

/// Containers likely to hold the main content, most specific first.
const CONTENT_SELECTORS: &[&str] = &["main", "article", r#"[role="main"]"#, ".content", "#content"];

/// Subtrees that never contribute body text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "noscript", "iframe", "svg",
];

/// Extract cleaned body text from a page. Returns an empty string when
/// neither pass finds content.
pub fn extract_body(html: &str, doc: &Html) -> String {
    let text = readable_text(doc);
    if !text.is_empty() {
        return cap(text);
    }

    debug!("no main-content container text, falling back to generic conversion");
    cap(html_to_text(html))
}

/// Apply the length cap, appending a marker when content was cut.
fn cap(text: String) -> String {
    let truncated = truncate_chars(&text, BODY_MAX_CHARS);
    if truncated.len() < text.len() {
        format!("{truncated}{TRUNCATION_MARKER}")
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// Primary pass: main-content container text
// ---------------------------------------------------------------------------

/// Collect text from the first content container that yields anything.
fn readable_text(doc: &Html) -> String {
    for selector in CONTENT_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(container) = doc.select(&sel).next() {
            let mut out = String::new();
            collect_text(container, &mut out);
            let collapsed = collapse_lines(&out);
            if !collapsed.is_empty() {
                return collapsed;
            }
        }
    }
    String::new()
}

/// Depth-first text collection, skipping non-content subtrees.
fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if SKIP_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            collect_text(child_el, out);
            // Element boundaries become line breaks so block structure
            // survives into the collapsed text.
            out.push('\n');
        }
    }
}

// ---------------------------------------------------------------------------
// Fallback pass: generic HTML-to-text conversion
// ---------------------------------------------------------------------------

/// Convert the whole document to text, stripping non-content tags.
fn html_to_text(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "meta", "link", "nav", "iframe", "noscript", "svg",
        ])
        .build();

    match converter.convert(html) {
        Ok(text) => collapse_lines(&text),
        Err(e) => {
            debug!(error = %e, "generic HTML-to-text conversion failed");
            String::new()
        }
    }
}

/// Trim every line and drop blank ones.
fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(html: &str) -> String {
        extract_body(html, &Html::parse_document(html))
    }

    #[test]
    fn prefers_main_container_text() {
        let html = r#"<html><body>
            <nav>Navigation links</nav>
            <main>
              <h1>Title</h1>
              <p>Main content paragraph.</p>
              <script>var tracking = true;</script>
            </main>
            <footer>Footer boilerplate</footer>
            </body></html>"#;

        let body = body_of(html);
        assert!(body.contains("Main content paragraph."));
        assert!(body.contains("Title"));
        assert!(!body.contains("Navigation links"));
        assert!(!body.contains("tracking"));
        assert!(!body.contains("Footer boilerplate"));
    }

    #[test]
    fn keeps_table_text() {
        let html = r#"<html><body><article>
            <table><tr><td>Cell one</td><td>Cell two</td></tr></table>
            </article></body></html>"#;

        let body = body_of(html);
        assert!(body.contains("Cell one"));
        assert!(body.contains("Cell two"));
    }

    #[test]
    fn drops_html_comments() {
        let html = r#"<html><body><main>
            <!-- hidden editorial note -->
            <p>Visible text.</p>
            </main></body></html>"#;

        let body = body_of(html);
        assert!(body.contains("Visible text."));
        assert!(!body.contains("hidden editorial note"));
    }

    #[test]
    fn falls_back_to_generic_conversion() {
        // No content container at all.
        let html = r#"<html><body>
            <div><p>Loose text outside any recognized container.</p></div>
            <script>ignored();</script>
            </body></html>"#;

        let body = body_of(html);
        assert!(body.contains("Loose text outside any recognized container."));
        assert!(!body.contains("ignored"));
    }

    #[test]
    fn collapses_blank_lines() {
        let html = "<html><body><main><p>one</p>\n\n\n<p>two</p></main></body></html>";
        let body = body_of(html);
        assert!(!body.contains("\n\n"));
        assert!(body.contains("one"));
        assert!(body.contains("two"));
    }

    #[test]
    fn caps_length_with_marker() {
        let long = "word ".repeat(2000);
        let html = format!("<html><body><main><p>{long}</p></main></body></html>");
        let body = body_of(&html);
        assert!(body.chars().count() <= BODY_MAX_CHARS + TRUNCATION_MARKER.len());
        assert!(body.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn empty_document_yields_empty_body() {
        assert_eq!(body_of("<html><body></body></html>"), "");
    }
}
