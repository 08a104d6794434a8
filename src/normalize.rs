// src/normalize.rs
// =============================================================================
// Canonical URL form used for deduplication.
//
// Two URLs that differ only in:
// - scheme or host case            (HTTP://Example.COM  vs  http://example.com)
// - an explicit default port       (http://example.com:80/)
// - an empty path                  (http://example.com  vs  http://example.com/)
// - a fragment                     (/page#top  vs  /page)
// are the same crawl node. The `url` crate already handles the first three
// while parsing; we strip the fragment on top of that.
//
// Nothing finer is attempted: query parameter order and trailing slashes
// are kept exactly as written.
// =============================================================================

use url::Url;

// Returns the canonical form of an already parsed URL
pub fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

// Parses a raw string and normalizes it in one go
pub fn parse_normalized(raw: &str) -> Result<Url, url::ParseError> {
    Url::parse(raw.trim()).map(normalize)
}

// Only http and https links are crawlable
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
