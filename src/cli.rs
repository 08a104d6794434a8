// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
//   crawl -u URL [-d DEPTH] [-p DELAY] [--no-tor] [--no-robots]
//         [--user-agent UA] [--max-pages N] [-o OUTDIR]
//
// The parsed Cli is turned into a CrawlConfig; the crawler never sees clap
// types.
// =============================================================================

use crate::config::{
    ConfigError, CrawlConfig, DEFAULT_DELAY_SECS, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_PAGES, DEFAULT_OUTPUT_DIR, DEFAULT_PROXY, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "crawl",
    version,
    about = "Polite breadth-first crawler for websites and onion services",
    long_about = "Crawls a site breadth-first, optionally through Tor's SOCKS proxy. \
                  Every fetched HTML page is saved to the output directory and every \
                  visit is recorded in crawl_log.csv."
)]
pub struct Cli {
    /// Start URL (http(s) or .onion)
    #[arg(short = 'u', long = "url")]
    pub url: String,

    /// How many link hops to follow from the start URL (0 = start page only)
    #[arg(short = 'd', long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub depth: usize,

    /// Delay between requests, in seconds
    #[arg(short = 'p', long, default_value_t = DEFAULT_DELAY_SECS)]
    pub delay: f64,

    /// Disable Tor (fetch pages directly)
    #[arg(long)]
    pub no_tor: bool,

    /// SOCKS proxy to use when Tor is enabled (host:port or a full proxy URL)
    #[arg(long, default_value = DEFAULT_PROXY)]
    pub proxy: String,

    /// Ignore robots.txt
    #[arg(long)]
    pub no_robots: bool,

    /// User-Agent header sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Maximum number of pages to fetch
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Output directory for saved pages and crawl_log.csv
    #[arg(short = 'o', long = "output", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Largest response body to download, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Follow links to other domains too
    #[arg(long)]
    pub allow_external: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn to_config(&self) -> Result<CrawlConfig, ConfigError> {
        let mut config = CrawlConfig::new(&self.url)?;
        config.max_depth = self.depth;
        config.delay_seconds = self.delay;
        config.use_proxy = !self.no_tor;
        config.proxy_endpoint = self.proxy.clone();
        config.respect_robots = !self.no_robots;
        config.user_agent = self.user_agent.clone();
        config.max_pages = self.max_pages;
        config.output_directory = self.output.clone();
        config.timeout_seconds = self.timeout;
        config.max_body_bytes = self.max_body_bytes;
        config.allow_external = self.allow_external;
        config.validate()?;
        Ok(config)
    }
}
