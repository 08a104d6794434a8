// src/crawl/politeness.rs
// =============================================================================
// Politeness: robots.txt compliance and the fixed delay between requests.
//
// robots.txt:
// - Fetched once per origin (scheme + host + port) per run, through the same
//   client as the pages, so over Tor when Tor is on
// - Rules are evaluated with Google's matcher (the `robotstxt` crate)
// - Missing, redirected, unreachable or unreadable robots.txt means
//   "allow everything"
//
// Delay:
// - The same fixed pause before every page fetch, whatever the host
// - Over Tor this is what keeps us from hammering a hidden service
// =============================================================================

use crate::config::CrawlConfig;
use crate::fetch::{FetchError, Fetcher};
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub struct PolitenessGate {
    respect_robots: bool,
    // Product token matched against User-agent lines ("ShadowCrawler")
    agent: String,
    delay: Duration,
    // origin -> robots.txt body, None when the host has no usable rules
    rules: HashMap<String, Option<String>>,
}

impl PolitenessGate {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            respect_robots: config.respect_robots,
            agent: product_token(&config.user_agent).to_string(),
            delay: config.delay(),
            rules: HashMap::new(),
        }
    }

    // Is the crawler allowed to fetch this URL?
    pub async fn permits(&mut self, url: &Url, fetcher: &Fetcher) -> bool {
        if !self.respect_robots {
            return true;
        }

        let origin = url.origin().ascii_serialization();
        if !self.rules.contains_key(&origin) {
            let body = load_rules(url, fetcher).await;
            self.rules.insert(origin.clone(), body);
        }

        match self.rules.get(&origin) {
            Some(Some(body)) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, &self.agent, url.as_str())
            }
            _ => true,
        }
    }

    // Sleeps for the configured delay before the next fetch
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

// Fetches robots.txt for the URL's origin.
// Every failure is logged and turns into None (allow-all).
async fn load_rules(url: &Url, fetcher: &Fetcher) -> Option<String> {
    let robots_url = match url.join("/robots.txt") {
        Ok(robots_url) => robots_url,
        Err(e) => {
            log::warn!("Cannot build robots.txt URL for {}: {}", url, e);
            return None;
        }
    };

    match fetcher.fetch(&robots_url).await {
        Ok(page) if page.status.is_redirection() => {
            log::info!(
                "robots.txt at {} redirects (HTTP {}), allowing all",
                robots_url,
                page.status.as_u16()
            );
            None
        }
        Ok(page) => match String::from_utf8(page.body) {
            Ok(body) => {
                log::debug!("Loaded robots.txt from {}", robots_url);
                Some(body)
            }
            Err(_) => {
                log::warn!("robots.txt at {} is not valid UTF-8, allowing all", robots_url);
                None
            }
        },
        Err(FetchError::HttpStatus(status)) => {
            log::info!("No robots.txt at {} (HTTP {}), allowing all", robots_url, status);
            None
        }
        Err(e) => {
            log::warn!("Could not fetch {}: {}, allowing all", robots_url, e);
            None
        }
    }
}

// robots.txt groups are keyed by product token, not the full header:
// "ShadowCrawler/1.0 (+https://example.local)" -> "ShadowCrawler"
pub fn product_token(user_agent: &str) -> &str {
    let user_agent = user_agent.trim();
    let end = user_agent
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(user_agent.len());
    &user_agent[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> CrawlConfig {
        let mut config = CrawlConfig::new(&server.uri()).unwrap();
        config.use_proxy = false;
        config.delay_seconds = 0.0;
        config
    }

    async fn mount_robots(server: &MockServer, body: &str, expected_fetches: u64) {
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_fetches)
            .mount(server)
            .await;
    }

    #[test]
    fn test_product_token() {
        assert_eq!(
            product_token("ShadowCrawler/1.0 (+https://example.local)"),
            "ShadowCrawler"
        );
        assert_eq!(product_token("my_bot-2"), "my_bot-2");
        assert_eq!(product_token("  Mozilla/5.0"), "Mozilla");
    }

    #[tokio::test]
    async fn test_disallowed_path_is_denied() {
        let server = MockServer::start().await;
        mount_robots(&server, "User-agent: *\nDisallow: /private/\n", 1).await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config).unwrap();
        let mut gate = PolitenessGate::new(&config);
        let base = config.seed_url.clone();

        assert!(!gate.permits(&base.join("/private/page").unwrap(), &fetcher).await);
        assert!(gate.permits(&base.join("/public").unwrap(), &fetcher).await);
    }

    #[tokio::test]
    async fn test_rules_are_scoped_to_user_agent() {
        let server = MockServer::start().await;
        mount_robots(
            &server,
            "User-agent: ShadowCrawler\nDisallow: /\n\nUser-agent: *\nAllow: /\n",
            1,
        )
        .await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config).unwrap();
        let mut gate = PolitenessGate::new(&config);

        assert!(!gate.permits(&config.seed_url, &fetcher).await);
    }

    #[tokio::test]
    async fn test_robots_fetched_once_per_host() {
        let server = MockServer::start().await;
        // expect(1) is verified when the server is dropped
        mount_robots(&server, "User-agent: *\nDisallow: /admin\n", 1).await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config).unwrap();
        let mut gate = PolitenessGate::new(&config);
        let base = config.seed_url.clone();

        for route in ["/a", "/b", "/admin", "/c"] {
            gate.permits(&base.join(route).unwrap(), &fetcher).await;
        }
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config).unwrap();
        let mut gate = PolitenessGate::new(&config);
        let base = config.seed_url.clone();

        assert!(gate.permits(&base.join("/anything").unwrap(), &fetcher).await);
        assert!(gate.permits(&base.join("/else").unwrap(), &fetcher).await);
    }

    #[tokio::test]
    async fn test_redirected_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere.txt"))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config).unwrap();
        let mut gate = PolitenessGate::new(&config);

        assert!(gate.permits(&config.seed_url.join("/admin").unwrap(), &fetcher).await);
    }

    #[tokio::test]
    async fn test_unreachable_host_allows_all() {
        let mut config = CrawlConfig::new("http://127.0.0.1:1/").unwrap();
        config.use_proxy = false;
        let fetcher = Fetcher::new(&config).unwrap();
        let mut gate = PolitenessGate::new(&config);

        assert!(gate.permits(&config.seed_url, &fetcher).await);
    }

    #[tokio::test]
    async fn test_robots_ignored_when_disabled() {
        let server = MockServer::start().await;
        mount_robots(&server, "User-agent: *\nDisallow: /\n", 0).await;

        let mut config = config_for(&server);
        config.respect_robots = false;
        let fetcher = Fetcher::new(&config).unwrap();
        let mut gate = PolitenessGate::new(&config);

        assert!(gate.permits(&config.seed_url, &fetcher).await);
    }

    #[tokio::test]
    async fn test_wait_sleeps_for_delay() {
        let mut config = CrawlConfig::new("http://example.com").unwrap();
        config.delay_seconds = 0.2;
        let gate = PolitenessGate::new(&config);

        let started = std::time::Instant::now();
        gate.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
