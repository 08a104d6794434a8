// src/main.rs
// =============================================================================
// This is the entry point of the crawler.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (RUST_LOG overrides the default "info" level)
// 3. Warn early if Tor is enabled but nothing listens on the proxy port
// 4. Run the crawl, with Ctrl-C wired to a graceful stop (a second Ctrl-C
//    exits at once) and a progress bar on interactive terminals
// 5. Print a summary and exit (0 = completed, 2 = aborted or usage error)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;        // src/cli.rs - command-line parsing
mod config;     // src/config.rs - validated run configuration
mod crawl;      // src/crawl/ - frontier, politeness and the crawl loop
mod fetch;      // src/fetch/ - HTTP and proxy access
mod links;      // src/links.rs - link extraction from HTML
mod normalize;  // src/normalize.rs - canonical URL form
mod store;      // src/store/ - saved pages and crawl_log.csv

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use crawl::{CrawlReport, CrawlState, Crawler};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

// How long the startup probe waits for the proxy to accept a connection
const PROXY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            // {:#} prints the whole cause chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns Ok once the crawl reached Completed; any Err means Aborted
async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.to_config().context("invalid command-line arguments")?;

    if let Ok(json) = serde_json::to_string(&config) {
        log::debug!("Effective configuration: {}", json);
    }

    if config.use_proxy {
        if fetch::proxy::probe(&config.proxy_endpoint, PROXY_PROBE_TIMEOUT).await {
            log::info!("Tor proxy is reachable at {}", config.proxy_endpoint);
        } else {
            log::warn!(
                "Nothing is listening on {}. Is Tor running? (sudo systemctl start tor) \
                 Pages will fail with connection errors; use --no-tor to crawl directly.",
                config.proxy_endpoint
            );
        }
    }

    let max_pages = config.max_pages;
    let mut crawler = Crawler::new(config).context("crawl aborted before the first request")?;
    log::debug!("Crawler ready ({:?})", crawler.state());

    // The bar would only get in the way of JSON output or a redirected stderr
    if !cli.json && std::io::stderr().is_terminal() {
        crawler.set_progress(progress_bar(max_pages));
    }

    // First Ctrl-C finishes the current page, then stops; the log stays valid.
    // Second Ctrl-C exits without waiting for the page in flight.
    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        log::warn!("Interrupt received, stopping after the current page (Ctrl-C again to quit now)");
        stop.stop();

        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Second interrupt, exiting");
            std::process::exit(130);
        }
    });

    let report = crawler.run().await.context("crawl aborted")?;
    print_report(&report, cli.json)
}

// Progress bar counting log rows against the page budget
fn progress_bar(max_pages: usize) -> ProgressBar {
    let bar = ProgressBar::new(max_pages as u64);
    match ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {wide_msg}")
    {
        Ok(style) => bar.set_style(style),
        Err(e) => log::debug!("Progress style rejected: {}", e),
    }
    bar
}

// Prints the report either as a short summary or as JSON
fn print_report(report: &CrawlReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("📊 Summary ({}):", format_state(report));
    println!("   ✅ Fetched: {}", report.stats.pages_fetched);
    println!("   ❌ Failed: {}", report.stats.pages_failed);
    println!("   🤖 Blocked by robots.txt: {}", report.stats.pages_skipped_by_robots);
    println!("   📄 Log: {}", report.log_path.display());
    Ok(())
}

fn format_state(report: &CrawlReport) -> &'static str {
    match (report.state, report.stopped_early) {
        (CrawlState::Completed, true) => "stopped early",
        (CrawlState::Completed, false) => "completed",
        (CrawlState::Aborted, _) => "aborted",
        (CrawlState::Idle | CrawlState::Running, _) => "unfinished",
    }
}
