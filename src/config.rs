// src/config.rs
// =============================================================================
// Crawl configuration: everything a run needs, built once at startup.
//
// The CLI fills a CrawlConfig, then the crawler validates it before touching
// the network or the disk. After that it is read-only.
//
// Defaults follow the classic Tor crawler setup:
// - traffic goes through Tor's SOCKS port on 127.0.0.1:9050
// - two seconds between requests
// - robots.txt is respected
// =============================================================================

use crate::normalize::{is_http, parse_normalized};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "ShadowCrawler/1.0 (+https://example.local)";
pub const DEFAULT_PROXY: &str = "127.0.0.1:9050";
pub const DEFAULT_DELAY_SECS: f64 = 2.0;
pub const DEFAULT_MAX_DEPTH: usize = 1;
pub const DEFAULT_MAX_PAGES: usize = 200;
pub const DEFAULT_OUTPUT_DIR: &str = "tor_output";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

// Problems with user input. All of them stop the run before the first fetch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid seed URL '{url}': {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("seed URL '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("seed URL '{0}' has no host")]
    MissingHost(String),

    #[error("delay must be a finite, non-negative number of seconds (got {0})")]
    InvalidDelay(f64),

    #[error("max pages must be at least 1")]
    ZeroPages,

    #[error("timeout must be at least 1 second")]
    ZeroTimeout,

    #[error("max body size must be at least 1 byte")]
    ZeroBodyLimit,

    #[error("user agent must not be empty")]
    EmptyUserAgent,

    #[error("invalid proxy endpoint '{endpoint}': {source}")]
    InvalidProxy {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlConfig {
    pub seed_url: Url,
    pub max_depth: usize,
    pub max_pages: usize,
    pub delay_seconds: f64,
    pub use_proxy: bool,
    pub proxy_endpoint: String,
    pub respect_robots: bool,
    pub user_agent: String,
    pub output_directory: PathBuf,
    pub timeout_seconds: u64,
    pub max_body_bytes: usize,
    // Follow links to hosts outside the seed's domain
    pub allow_external: bool,
}

impl CrawlConfig {
    // Creates a config with defaults for everything but the seed
    pub fn new(seed_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            seed_url: parse_seed(seed_url)?,
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            delay_seconds: DEFAULT_DELAY_SECS,
            use_proxy: true,
            proxy_endpoint: DEFAULT_PROXY.to_string(),
            respect_robots: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allow_external: false,
        })
    }

    // Checks the numeric limits. The seed was checked by new().
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delay_seconds.is_finite() || self.delay_seconds < 0.0 {
            return Err(ConfigError::InvalidDelay(self.delay_seconds));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroPages);
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

// Parses the seed the way users type it: a bare "example.onion" means http
fn parse_seed(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = parse_normalized(&candidate).map_err(|source| ConfigError::InvalidSeed {
        url: raw.to_string(),
        source,
    })?;

    if !is_http(&url) {
        return Err(ConfigError::UnsupportedScheme(raw.to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingHost(raw.to_string()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::new("http://example.com").unwrap();
        assert_eq!(config.seed_url.as_str(), "http://example.com/");
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.max_pages, 200);
        assert!(config.use_proxy);
        assert!(config.respect_robots);
        assert_eq!(config.proxy_endpoint, "127.0.0.1:9050");
        assert_eq!(config.output_directory, PathBuf::from("tor_output"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bare_host_defaults_to_http() {
        let config = CrawlConfig::new("exampleonionaddress.onion/index").unwrap();
        assert_eq!(
            config.seed_url.as_str(),
            "http://exampleonionaddress.onion/index"
        );
    }

    #[test]
    fn test_seed_fragment_is_dropped() {
        let config = CrawlConfig::new("https://example.com/docs#intro").unwrap();
        assert_eq!(config.seed_url.as_str(), "https://example.com/docs");
    }

    #[test]
    fn test_rejects_non_http_seed() {
        let err = CrawlConfig::new("ftp://example.com/").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_rejects_garbage_seed() {
        let err = CrawlConfig::new("http://exa mple.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSeed { .. }));
    }

    #[test]
    fn test_rejects_bad_limits() {
        let mut config = CrawlConfig::new("http://example.com").unwrap();
        config.delay_seconds = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDelay(_))));

        config.delay_seconds = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDelay(_))));

        config.delay_seconds = 0.0;
        config.max_pages = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPages)));

        config.max_pages = 1;
        config.timeout_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_delay_duration() {
        let mut config = CrawlConfig::new("http://example.com").unwrap();
        config.delay_seconds = 1.5;
        assert_eq!(config.delay(), Duration::from_millis(1500));
    }
}
