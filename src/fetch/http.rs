// src/fetch/http.rs
// =============================================================================
// This module fetches single pages over HTTP(S).
//
// Key functionality:
// - One GET per call, no retries (a failed page is logged and skipped)
// - Optional routing through a SOCKS proxy (Tor)
// - Sorts failures into a handful of kinds the crawl log understands
// - Caps the body size so one huge download cannot eat all memory
// - Never follows redirects itself: a 3xx comes back as a page and the
//   crawl loop decides whether the Location may be visited
//
// Rust concepts:
// - async/await: the request is awaited, the crawl loop waits with it
// - Result<T, E>: every failure comes back as a FetchError value
// =============================================================================

use crate::config::{ConfigError, CrawlConfig};
use crate::fetch::proxy;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Proxy, StatusCode};
use std::borrow::Cow;
use thiserror::Error;
use url::Url;

// Why a fetch did not produce a page.
// None of these stop the crawl; they end up as a row in the crawl log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network, DNS, TLS or proxy failure (includes "Tor is not running")
    #[error("connection failed: {0}")]
    Connection(String),
    /// No complete response within the configured timeout
    #[error("request timed out")]
    Timeout,
    /// The server answered with a 4xx or 5xx status
    #[error("HTTP {0}")]
    HttpStatus(u16),
    /// The body is bigger than the configured ceiling
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl FetchError {
    // Short machine-readable name, used in the CSV status column
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Connection(_) => "connection",
            FetchError::Timeout => "timeout",
            FetchError::HttpStatus(_) => "http_status",
            FetchError::TooLarge { .. } => "too_large",
        }
    }
}

// A successfully downloaded response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl FetchedPage {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    // Servers that send no content type at all are given the benefit of the doubt
    pub fn is_html(&self) -> bool {
        match self.content_type() {
            None => true,
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml+xml")
            }
        }
    }

    // For a 3xx response: the Location header resolved against the page URL
    pub fn redirect_target(&self) -> Option<Url> {
        if !self.status.is_redirection() {
            return None;
        }
        let location = self.headers.get(LOCATION)?.to_str().ok()?;
        self.url.join(location.trim()).ok()
    }

    // Body as text; invalid UTF-8 sequences are replaced, never fatal
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

pub struct Fetcher {
    client: Client,
    max_body_bytes: usize,
}

impl Fetcher {
    // Builds the HTTP client once; it is reused for every request
    // (connection pooling, and the same Tor circuit isolation settings)
    pub fn new(config: &CrawlConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::none());

        builder = if config.use_proxy {
            let proxy_url = proxy::proxy_url(&config.proxy_endpoint);
            let proxy = Proxy::all(&proxy_url).map_err(|source| ConfigError::InvalidProxy {
                endpoint: config.proxy_endpoint.clone(),
                source,
            })?;
            builder.proxy(proxy)
        } else {
            // Direct means direct: ignore HTTP_PROXY and friends from the environment
            builder.no_proxy()
        };

        let client = builder.build().map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    // Fetches one URL.
    //
    // Returns: the page for 1xx/2xx/3xx responses, a FetchError otherwise
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        // Refuse early when the server tells us the size up front
        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        // Otherwise read chunk by chunk and stop as soon as we pass the limit
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(categorize_error)? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            url: response.url().clone(),
            status,
            headers: response.headers().clone(),
            body,
        })
    }
}

// Sorts reqwest errors into our failure kinds.
//
// Anything that is not a timeout means we never got a usable response:
// refused connections, DNS failures, a SOCKS proxy that is not listening
// and TLS problems all land in Connection.
fn categorize_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Connection(error_chain(&error))
    }
}

// reqwest's Display only shows the outermost layer; the useful part
// ("Connection refused", "socks connect error") is usually further down
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
