//! Bookmark file parsers.
//!
//! Two formats are supported: the Chromium `Bookmarks` JSON tree (Chrome,
//! Edge, Brave, Opera) and the Netscape bookmark-export HTML format that
//! Firefox and most other browsers produce on export.

use linkloom_shared::{BookmarkRecord, LinkloomError, Result};
use scraper::{ElementRef, Html, Selector};

// ---------------------------------------------------------------------------
// Chromium JSON
// ---------------------------------------------------------------------------

/// Parse a Chromium-format `Bookmarks` JSON document.
pub fn parse_chromium_json(content: &str, source: &str) -> Result<Vec<BookmarkRecord>> {
    let data: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| LinkloomError::parse(format!("invalid Chromium bookmarks JSON: {e}")))?;

    let roots = data
        .get("roots")
        .and_then(|r| r.as_object())
        .ok_or_else(|| LinkloomError::parse("Chromium bookmarks JSON has no roots object"))?;

    let mut records = Vec::new();
    for root in roots.values() {
        walk_chromium_node(root, "", source, &mut records);
    }
    Ok(records)
}

/// Recursively walk a bookmark tree node, accumulating the folder path.
fn walk_chromium_node(
    node: &serde_json::Value,
    folder: &str,
    source: &str,
    out: &mut Vec<BookmarkRecord>,
) {
    let Some(node_type) = node.get("type").and_then(|t| t.as_str()) else {
        return;
    };
    let name = node.get("name").and_then(|n| n.as_str()).unwrap_or("");

    match node_type {
        "url" => {
            let url = node.get("url").and_then(|u| u.as_str()).unwrap_or("");
            if !url.is_empty() {
                out.push(BookmarkRecord {
                    url: url.to_string(),
                    name: name.to_string(),
                    folder: folder.trim_matches('/').to_string(),
                    source: source.to_string(),
                });
            }
        }
        "folder" => {
            let child_folder = if folder.is_empty() {
                name.to_string()
            } else {
                format!("{folder}/{name}")
            };
            if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
                for child in children {
                    walk_chromium_node(child, &child_folder, source, out);
                }
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Netscape bookmark-export HTML
// ---------------------------------------------------------------------------

/// Parse a Netscape bookmark-export HTML document (`<DL>`/`<DT>`/`<H3>`
/// folder structure with `<A HREF>` leaves).
pub fn parse_netscape_html(content: &str, source: &str) -> Result<Vec<BookmarkRecord>> {
    let doc = Html::parse_document(content);
    let link_sel = Selector::parse("a[href]")
        .map_err(|e| LinkloomError::parse(format!("selector: {e}")))?;

    let mut records = Vec::new();
    for link in doc.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href.is_empty() || href.starts_with("place:") || href.starts_with("javascript:") {
            continue;
        }

        let name = link.text().collect::<String>().trim().to_string();

        records.push(BookmarkRecord {
            url: href.to_string(),
            name,
            folder: folder_path_of(link),
            source: source.to_string(),
        });
    }
    Ok(records)
}

/// Build the folder path for a bookmark link from its enclosing `<DT>`
/// ancestors. Each folder level is a `<DT>` whose first `<H3>` child names
/// the folder; the export nests the child `<DL>` inside that `<DT>`.
fn folder_path_of(link: ElementRef<'_>) -> String {
    let mut folders: Vec<String> = Vec::new();

    for ancestor in link.ancestors() {
        let Some(el) = ElementRef::wrap(ancestor) else {
            continue;
        };
        if el.value().name() != "dt" {
            continue;
        }

        let heading = el
            .children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name() == "h3");

        if let Some(h3) = heading {
            let title = h3.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                folders.push(title);
            }
        }
    }

    folders.reverse();
    folders.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROMIUM_FIXTURE: &str = r#"{
        "roots": {
            "bookmark_bar": {
                "type": "folder",
                "name": "Bookmarks bar",
                "children": [
                    {"type": "url", "name": "Rust", "url": "https://www.rust-lang.org/"},
                    {
                        "type": "folder",
                        "name": "Reading",
                        "children": [
                            {"type": "url", "name": "Blog post", "url": "https://example.com/post"},
                            {"type": "url", "name": "No URL", "url": ""}
                        ]
                    }
                ]
            },
            "other": {
                "type": "folder",
                "name": "Other bookmarks",
                "children": []
            }
        }
    }"#;

    #[test]
    fn chromium_tree_walk_accumulates_folders() {
        let records = parse_chromium_json(CHROMIUM_FIXTURE, "chrome").expect("parse");
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].url, "https://www.rust-lang.org/");
        assert_eq!(records[0].name, "Rust");
        assert_eq!(records[0].folder, "Bookmarks bar");
        assert_eq!(records[0].source, "chrome");

        assert_eq!(records[1].url, "https://example.com/post");
        assert_eq!(records[1].folder, "Bookmarks bar/Reading");
    }

    #[test]
    fn chromium_invalid_json_is_a_parse_error() {
        let err = parse_chromium_json("{broken", "chrome").unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn chromium_missing_roots_is_a_parse_error() {
        assert!(parse_chromium_json(r#"{"version": 1}"#, "chrome").is_err());
    }

    const NETSCAPE_FIXTURE: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><H3>Dev</H3>
    <DL><p>
        <DT><A HREF="https://www.rust-lang.org/">Rust</A>
        <DT><H3>Tools</H3>
        <DL><p>
            <DT><A HREF="https://example.com/grep">Grep</A>
        </DL><p>
    </DL><p>
    <DT><A HREF="https://example.com/top">Top Level</A>
</DL>"#;

    #[test]
    fn netscape_nested_folders() {
        let records = parse_netscape_html(NETSCAPE_FIXTURE, "firefox").expect("parse");
        assert_eq!(records.len(), 3);

        let by_url = |url: &str| {
            records
                .iter()
                .find(|r| r.url == url)
                .unwrap_or_else(|| panic!("missing record for {url}"))
        };

        assert_eq!(by_url("https://www.rust-lang.org/").folder, "Dev");
        assert_eq!(by_url("https://www.rust-lang.org/").name, "Rust");
        assert_eq!(by_url("https://example.com/grep").folder, "Dev/Tools");
        assert_eq!(by_url("https://example.com/top").folder, "");
        assert!(records.iter().all(|r| r.source == "firefox"));
    }

    #[test]
    fn netscape_skips_place_and_javascript_links() {
        let html = r#"<DL>
            <DT><A HREF="place:sort=8">Most Visited</A>
            <DT><A HREF="javascript:void(0)">Bookmarklet</A>
            <DT><A HREF="https://example.com">Real</A>
        </DL>"#;
        let records = parse_netscape_html(html, "firefox").expect("parse");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://example.com");
    }
}
