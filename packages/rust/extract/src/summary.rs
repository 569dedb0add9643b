//! Summary extraction via an ordered fallback chain over page metadata.
//!
//! Sources, first non-empty wins:
//! 1. Open Graph description
//! 2. standard meta description
//! 3. Twitter Card description
//! 4. JSON-LD structured data (`description`/`about`/`abstract`, including
//!    one level of `@graph` nesting)
//! 5. first meaningful paragraph inside a main-content container
//! 6. page title

use scraper::{Html, Selector};

use crate::{MIN_PARAGRAPH_CHARS, SUMMARY_MAX_CHARS, TITLE_MAX_CHARS, truncate_chars};

/// Content containers searched for a leading paragraph, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    ".content",
    "#content",
    "body",
];

/// Extract a short summary from a parsed document. Returns an empty string
/// when no source in the chain yields anything.
pub fn extract_summary(doc: &Html) -> String {
    if let Some(desc) = meta_content(doc, r#"meta[property="og:description"]"#) {
        return truncate_chars(&desc, SUMMARY_MAX_CHARS).to_string();
    }
    if let Some(desc) = meta_content(doc, r#"meta[name="description"]"#) {
        return truncate_chars(&desc, SUMMARY_MAX_CHARS).to_string();
    }
    if let Some(desc) = meta_content(doc, r#"meta[name="twitter:description"]"#) {
        return truncate_chars(&desc, SUMMARY_MAX_CHARS).to_string();
    }
    if let Some(desc) = json_ld_description(doc) {
        return truncate_chars(&desc, SUMMARY_MAX_CHARS).to_string();
    }
    if let Some(text) = first_meaningful_paragraph(doc) {
        return truncate_chars(&text, SUMMARY_MAX_CHARS).to_string();
    }
    if let Some(title) = page_title(doc) {
        return truncate_chars(&title, TITLE_MAX_CHARS).to_string();
    }

    String::new()
}

/// Read the trimmed, non-empty `content` attribute of the first element
/// matching `selector`.
fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

/// Scan JSON-LD blocks for a description-like field.
fn json_ld_description(doc: &Html) -> Option<String> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in doc.select(&sel) {
        let raw = script.text().collect::<String>();
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue;
        };

        if let Some(desc) = description_from_value(&data) {
            return Some(desc);
        }

        // One level of nested graph arrays.
        if let Some(graph) = data.get("@graph").and_then(|g| g.as_array()) {
            for item in graph {
                if let Some(desc) = description_from_value(item) {
                    return Some(desc);
                }
            }
        }
    }

    None
}

/// Pull a `description`/`about`/`abstract` string out of one JSON-LD object.
fn description_from_value(value: &serde_json::Value) -> Option<String> {
    for key in ["description", "about", "abstract"] {
        if let Some(desc) = value.get(key).and_then(|v| v.as_str()) {
            let desc = desc.trim();
            if !desc.is_empty() {
                return Some(desc.to_string());
            }
        }
    }
    None
}

/// First paragraph of meaningful length inside a main-content container.
fn first_meaningful_paragraph(doc: &Html) -> Option<String> {
    let p_sel = Selector::parse("p").ok()?;

    for container_sel in CONTENT_SELECTORS {
        let Ok(sel) = Selector::parse(container_sel) else {
            continue;
        };
        let Some(container) = doc.select(&sel).next() else {
            continue;
        };

        for p in container.select(&p_sel) {
            let text = p.text().collect::<String>();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.chars().count() >= MIN_PARAGRAPH_CHARS {
                return Some(text);
            }
        }
    }

    None
}

/// Trimmed `<title>` text, if present and non-empty.
fn page_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("title").ok()?;
    let title = doc.select(&sel).next()?.text().collect::<String>();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_of(html: &str) -> String {
        extract_summary(&Html::parse_document(html))
    }

    #[test]
    fn og_description_wins() {
        let html = r#"<html><head>
            <meta property="og:description" content="From Open Graph">
            <meta name="description" content="From meta description">
            <meta name="twitter:description" content="From Twitter">
            </head><body></body></html>"#;
        assert_eq!(summary_of(html), "From Open Graph");
    }

    #[test]
    fn meta_description_before_twitter() {
        let html = r#"<html><head>
            <meta name="twitter:description" content="From Twitter">
            <meta name="description" content="From meta description">
            </head></html>"#;
        assert_eq!(summary_of(html), "From meta description");
    }

    #[test]
    fn twitter_card_used_when_others_missing() {
        let html = r#"<html><head>
            <meta name="twitter:description" content="From Twitter">
            </head></html>"#;
        assert_eq!(summary_of(html), "From Twitter");
    }

    #[test]
    fn empty_og_content_falls_through() {
        let html = r#"<html><head>
            <meta property="og:description" content="   ">
            <meta name="description" content="Real description">
            </head></html>"#;
        assert_eq!(summary_of(html), "Real description");
    }

    #[test]
    fn og_summary_truncated_at_limit() {
        let long = "x".repeat(800);
        let html = format!(r#"<html><head><meta property="og:description" content="{long}"></head></html>"#);
        let summary = summary_of(&html);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS);
    }

    #[test]
    fn json_ld_description_field() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@type": "Article", "description": "From structured data"}
            </script>
            </head></html>"#;
        assert_eq!(summary_of(html), "From structured data");
    }

    #[test]
    fn json_ld_nested_graph() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@graph": [{"@type": "WebSite"}, {"@type": "WebPage", "description": "Nested graph description"}]}
            </script>
            </head></html>"#;
        assert_eq!(summary_of(html), "Nested graph description");
    }

    #[test]
    fn invalid_json_ld_is_skipped() {
        let html = r#"<html><head>
            <script type="application/ld+json">{not json</script>
            <title>Fallback Title</title>
            </head></html>"#;
        assert_eq!(summary_of(html), "Fallback Title");
    }

    #[test]
    fn paragraph_from_main_container() {
        let html = r#"<html><body>
            <nav><p>Short nav text paragraph that is definitely long enough to qualify here.</p></nav>
            <main>
              <p>tiny</p>
              <p>This is the first meaningful paragraph with enough characters to qualify.</p>
            </main>
            </body></html>"#;
        assert_eq!(
            summary_of(html),
            "This is the first meaningful paragraph with enough characters to qualify."
        );
    }

    #[test]
    fn short_paragraphs_fall_through_to_title() {
        let html = r#"<html><head><title>Just The Title</title></head>
            <body><main><p>too short</p></main></body></html>"#;
        assert_eq!(summary_of(html), "Just The Title");
    }

    #[test]
    fn title_truncated_to_its_own_limit() {
        let long = "t".repeat(400);
        let html = format!("<html><head><title>{long}</title></head><body></body></html>");
        assert_eq!(summary_of(&html).chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn empty_page_yields_empty_summary() {
        assert_eq!(summary_of("<html><body></body></html>"), "");
    }
}
