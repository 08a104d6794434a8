// src/links.rs
// =============================================================================
// This module extracts outbound links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever, which recovers from broken markup the same way
//   browsers do, so a malformed page still yields whatever links it has
//
// Links come out lazily: extract() parses once, and every call to
// PageLinks::iter() walks the parsed document again from the start.
// =============================================================================

use crate::normalize::{is_http, normalize};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

// Elements that navigate somewhere when clicked
static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href], area[href]").expect("anchor selector is valid"));

// <base href="..."> changes what relative links are relative to
static BASE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("base selector is valid"));

// The parsed links of one page
pub struct PageLinks {
    document: Html,
    base: Url,
}

// Parses a page so its links can be iterated
//
// Parameters:
//   base_url: the URL the page was fetched from
//   html: the page body
//
// Example:
//   base_url = "https://example.com/docs/"
//   html = "<a href='intro'>Intro</a> <a href='mailto:me@x.org'>Mail</a>"
//   iter() yields ["https://example.com/docs/intro"]
pub fn extract(base_url: &Url, html: &str) -> PageLinks {
    let document = Html::parse_document(html);

    let base = document
        .select(&BASE)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| base_url.join(href.trim()).ok())
        .filter(is_http)
        .unwrap_or_else(|| base_url.clone());

    PageLinks { document, base }
}

impl PageLinks {
    // Absolute, normalized http(s) URLs in document order.
    // Duplicates are left in; the frontier drops them.
    pub fn iter(&self) -> impl Iterator<Item = Url> + '_ {
        self.document
            .select(&ANCHORS)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(move |href| resolve_url(&self.base, href))
    }
}

// Resolves a possibly-relative href against the base
//
// Returns None for:
// - empty hrefs and same-page anchors ("#top")
// - hrefs the url crate cannot resolve
// - anything that is not http or https (mailto:, javascript:, tel:, data:, ...)
fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let url = base.join(href).ok()?;
    if is_http(&url) {
        Some(normalize(url))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(html: &str, base: &str) -> Vec<String> {
        let base = Url::parse(base).unwrap();
        extract(&base, html).iter().map(String::from).collect()
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<a href="https://www.rust-lang.org">Rust</a>"#;
        assert_eq!(
            links(html, "https://example.com"),
            vec!["https://www.rust-lang.org/"]
        );
    }

    #[test]
    fn test_resolve_relative_link() {
        let html = r#"<a href="/docs">Docs</a> <a href="../about">About</a>"#;
        assert_eq!(
            links(html, "https://example.com/page/sub/"),
            vec!["https://example.com/docs", "https://example.com/page/about"]
        );
    }

    #[test]
    fn test_skip_non_http_schemes() {
        let html = r#"
            <a href="mailto:test@example.com">Email</a>
            <a href="javascript:void(0)">JS</a>
            <a href="tel:+123456">Call</a>
            <a href="ftp://files.example.com/x">FTP</a>
        "#;
        assert!(links(html, "https://example.com").is_empty());
    }

    #[test]
    fn test_fragments_are_stripped() {
        let html = r##"<a href="#top">Top</a> <a href="/guide#install">Install</a>"##;
        assert_eq!(
            links(html, "https://example.com/"),
            vec!["https://example.com/guide"]
        );
    }

    #[test]
    fn test_area_elements_count_as_links() {
        let html = r#"<map><area href="/region" alt="r"></map>"#;
        assert_eq!(
            links(html, "https://example.com/"),
            vec!["https://example.com/region"]
        );
    }

    #[test]
    fn test_base_element_overrides_page_url() {
        let html = r#"<head><base href="https://cdn.example.com/root/"></head>
                      <body><a href="page">Page</a></body>"#;
        assert_eq!(
            links(html, "https://example.com/elsewhere/"),
            vec!["https://cdn.example.com/root/page"]
        );
    }

    #[test]
    fn test_malformed_html_yields_partial_links() {
        // Unclosed tags, a stray closing tag and a broken attribute
        let html = r#"<div><a href="/one">one<p><a href="/two"</div></span><a href=/three>three"#;
        let found = links(html, "https://example.com/");
        assert!(found.contains(&"https://example.com/one".to_string()));
        assert!(found.contains(&"https://example.com/three".to_string()));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let base = Url::parse("https://example.com/").unwrap();
        let page = extract(&base, r#"<a href="/a">A</a><a href="/b">B</a>"#);

        let first: Vec<Url> = page.iter().collect();
        let second: Vec<Url> = page.iter().collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_onion_links() {
        let html = r#"<a href="http://abcdefghijklmnop.onion/market">Market</a>"#;
        assert_eq!(
            links(html, "http://seedonionaddress.onion/"),
            vec!["http://abcdefghijklmnop.onion/market"]
        );
    }
}
