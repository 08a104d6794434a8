// src/crawl/engine.rs
// =============================================================================
// The crawl engine: a breadth-first loop over the frontier.
//
// Lifecycle:
//   Idle       Crawler::new() validated the config, opened the output
//              directory and queued the seed at depth 0
//   Running    run() is taking pages off the frontier
//   Completed  frontier empty, page budget spent, or stop requested
//   Aborted    startup failed, or the crawl log stopped accepting writes
//
// For each page:
// 1. Take the oldest target from the frontier
// 2. Ask robots.txt; if denied, log a skip and move on
// 3. Wait the politeness delay (a stop request cuts the wait short)
// 4. Fetch; if it fails, log the failure and move on
// 5. A redirect is logged, and its Location goes back into the frontier
// 6. Save the body, log the visit
// 7. If we are not at max depth yet, queue the page's links at depth + 1
//
// Pages are fetched one at a time.
// =============================================================================

use crate::config::{ConfigError, CrawlConfig};
use crate::crawl::frontier::{CrawlTarget, Frontier};
use crate::crawl::politeness::PolitenessGate;
use crate::fetch::{FetchedPage, Fetcher};
use crate::links;
use crate::normalize::is_http;
use crate::store::{Sink, SinkError, VisitRecord, VisitStatus};
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Idle,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pages_skipped_by_robots: usize,
}

impl CrawlStats {
    // Fetch attempts so far; this is what max_pages limits
    pub fn attempts(&self) -> usize {
        self.pages_fetched + self.pages_failed
    }
}

// What a finished run hands back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub state: CrawlState,
    pub stats: CrawlStats,
    // True when a stop request ended the run before the frontier ran dry
    pub stopped_early: bool,
    pub log_path: PathBuf,
}

// Errors that end a whole run. Everything page-level is a log row instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

// Lets another task (the Ctrl-C handler) ask the crawl to stop.
// The engine finishes the page it is on, then stops cleanly. A pending
// politeness delay is abandoned right away.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<StopSignal>);

#[derive(Debug, Default)]
struct StopSignal {
    stopped: AtomicBool,
    // Wakes anyone parked in stopped()
    notify: Notify,
}

impl StopHandle {
    pub fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.stopped.load(Ordering::SeqCst)
    }

    // Resolves once stop() has been called
    pub async fn stopped(&self) {
        // Register before checking the flag, so a stop() in between is not missed
        let notified = self.0.notify.notified();
        if self.is_stopped() {
            return;
        }
        notified.await;
    }
}

pub struct Crawler {
    config: CrawlConfig,
    frontier: Frontier,
    gate: PolitenessGate,
    fetcher: Fetcher,
    sink: Sink,
    stats: CrawlStats,
    state: CrawlState,
    stop: StopHandle,
    // Advanced once per log row; hidden unless the CLI installs a visible one
    progress: ProgressBar,
}

impl Crawler {
    // Prepares a run. Any error here means nothing was fetched.
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        config.validate()?;
        let fetcher = Fetcher::new(&config)?;
        let sink = Sink::open(&config.output_directory)?;
        let gate = PolitenessGate::new(&config);

        // The seed is the only target that skips scope checks
        let mut frontier = Frontier::new();
        frontier.enqueue(CrawlTarget::new(config.seed_url.clone(), 0));

        Ok(Self {
            config,
            frontier,
            gate,
            fetcher,
            sink,
            stats: CrawlStats::default(),
            state: CrawlState::Idle,
            stop: StopHandle::default(),
            progress: ProgressBar::hidden(),
        })
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn set_progress(&mut self, progress: ProgressBar) {
        self.progress = progress;
    }

    // Runs the crawl to the end
    pub async fn run(mut self) -> Result<CrawlReport, CrawlError> {
        self.state = CrawlState::Running;
        log::info!(
            "Starting crawl: {} | depth={} | max_pages={} | proxy={}",
            self.config.seed_url,
            self.config.max_depth,
            self.config.max_pages,
            if self.config.use_proxy { "ON" } else { "OFF" }
        );

        let outcome = self.crawl_loop().await;
        self.progress.finish_and_clear();

        match outcome {
            Ok(stopped_early) => {
                self.state = CrawlState::Completed;
                log::info!(
                    "Crawl complete: {} fetched, {} failed, {} blocked by robots.txt",
                    self.stats.pages_fetched,
                    self.stats.pages_failed,
                    self.stats.pages_skipped_by_robots
                );
                Ok(CrawlReport {
                    state: self.state,
                    stats: self.stats.clone(),
                    stopped_early,
                    log_path: self.sink.log_path().to_path_buf(),
                })
            }
            Err(e) => {
                // Only the log failing gets us here; the rows so far stay on disk
                self.state = CrawlState::Aborted;
                log::error!("Crawl aborted: {}", e);
                Err(e)
            }
        }
    }

    // Returns Ok(true) if a stop request cut the run short
    async fn crawl_loop(&mut self) -> Result<bool, CrawlError> {
        // Robots skips are not attempts, so they never use up the budget
        while self.stats.attempts() < self.config.max_pages {
            // Checked between pages: the page in flight always gets its row
            if self.stop.is_stopped() {
                log::warn!(
                    "Stop requested, {} page(s) left in the frontier",
                    self.frontier.len()
                );
                return Ok(true);
            }

            let Some(target) = self.frontier.dequeue() else {
                log::debug!("Frontier exhausted");
                break;
            };
            self.visit(target).await?;
        }

        if !self.frontier.is_empty() {
            log::info!(
                "Page limit of {} reached with {} page(s) still queued",
                self.config.max_pages,
                self.frontier.len()
            );
        }
        Ok(false)
    }

    // One pass through steps 2 to 7 for a single target.
    // Only a crawl log failure is returned as an error.
    async fn visit(&mut self, target: CrawlTarget) -> Result<(), CrawlError> {
        // Enqueue already enforces this; a violation means a bug upstream
        if target.depth() > self.config.max_depth {
            log::debug!("Discarding {} beyond max depth", target.url());
            return Ok(());
        }

        // Step 2: robots.txt (loaded on first contact with each origin)
        if !self.gate.permits(target.url(), &self.fetcher).await {
            log::info!("Blocked by robots.txt: {}", target.url());
            self.stats.pages_skipped_by_robots += 1;
            return self.record(VisitRecord::new(&target, VisitStatus::RobotsBlocked));
        }

        // Step 3: politeness delay, abandoned if a stop comes in meanwhile.
        // The target is dropped unfetched, as if the loop had stopped first.
        tokio::select! {
            _ = self.gate.wait() => {}
            _ = self.stop.stopped() => {
                log::debug!("Stopped during the delay, {} not fetched", target.url());
                return Ok(());
            }
        }
        log::info!("Crawling [depth {}]: {}", target.depth(), target.url());

        // Step 4: fetch; every failure becomes a row and the crawl goes on
        let page = match self.fetcher.fetch(target.url()).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Error fetching {}: {}", target.url(), e);
                self.stats.pages_failed += 1;
                return self.record(VisitRecord::new(&target, VisitStatus::FetchFailed(e)));
            }
        };

        let mut record = VisitRecord::new(&target, VisitStatus::Fetched(page.status.as_u16()))
            .with_content_type(page.content_type().map(str::to_owned));

        // Step 5: the client never follows redirects. The Location is queued
        // like a link, so robots.txt, scope and dedup all get a say.
        if page.status.is_redirection() {
            self.stats.pages_fetched += 1;
            self.record(record)?;
            match page.redirect_target() {
                Some(location) => self.follow_redirect(location, target.depth()),
                None => log::warn!("{} redirected without a usable Location", target.url()),
            }
            return Ok(());
        }

        // Only HTML is worth keeping and parsing; images, PDFs and the like
        // are logged with their status and nothing else
        if !page.is_html() {
            self.stats.pages_fetched += 1;
            return self.record(record);
        }

        // Step 6: save, then log. A page that cannot be written counts as
        // failed and its links are not followed.
        match self.sink.save_page(target.url(), &page.body) {
            Ok(path) => record = record.with_saved_path(path),
            Err(e) => {
                log::warn!("{}", e);
                self.stats.pages_failed += 1;
                record.status = VisitStatus::SaveFailed;
                return self.record(record);
            }
        }

        self.stats.pages_fetched += 1;
        self.record(record)?;

        // Step 7: children go one level deeper, and only while below max depth
        if target.depth() < self.config.max_depth {
            let queued = self.discover(&page, target.depth() + 1);
            log::debug!("Queued {} new link(s) from {}", queued, target.url());
        }
        Ok(())
    }

    // Queues the page's links at the given depth. Returns how many were new.
    //
    // Kept synchronous: the parsed document is not Send and must not live
    // across an await point.
    fn discover(&mut self, page: &FetchedPage, depth: usize) -> usize {
        let html = page.text();
        let links = links::extract(&page.url, &html);

        let mut queued = 0;
        for url in links.iter() {
            if self.offer(url, depth) {
                queued += 1;
            }
        }
        queued
    }

    // The redirect target stands in for the link that led to it,
    // so it keeps that link's depth
    fn follow_redirect(&mut self, location: Url, depth: usize) {
        if !is_http(&location) {
            log::debug!("Ignoring redirect to {}", location);
            return;
        }
        if self.offer(location.clone(), depth) {
            log::debug!("Queued redirect target {}", location);
        } else {
            log::debug!("Not following redirect to {}", location);
        }
    }

    // Queues a discovered URL if it is in scope, new, and within budget.
    // Returns true when it was actually queued.
    fn offer(&mut self, url: Url, depth: usize) -> bool {
        // No point tracking more URLs than we are allowed to fetch
        if self.frontier.seen() >= self.config.max_pages {
            return false;
        }
        if !self.in_scope(&url) {
            log::trace!("Out of scope: {}", url);
            return false;
        }
        // enqueue() normalizes and does the seen-set test-and-set
        self.frontier.enqueue(CrawlTarget::new(url, depth))
    }

    // Same host as the seed, or a subdomain of it, unless external links are allowed
    fn in_scope(&self, url: &Url) -> bool {
        if self.config.allow_external {
            return true;
        }
        let (Some(host), Some(seed)) = (url.host_str(), self.config.seed_url.host_str()) else {
            return false;
        };
        host == seed || host.ends_with(&format!(".{}", seed))
    }

    // Every row goes through here: write it, then tick the progress bar
    fn record(&mut self, record: VisitRecord) -> Result<(), CrawlError> {
        self.sink.append_log(&record)?;
        self.progress.inc(1);
        self.progress.set_message(record.url);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does run() take `self` and not `&mut self`?
//    - A Crawler is good for exactly one run
//    - Taking ownership means nobody can call run() twice by accident
//    - The StopHandle is cloned out beforehand, so Ctrl-C still reaches it
//
// 2. What is `let ... else`?
//    - let Some(target) = self.frontier.dequeue() else { break; };
//    - Binds target if the pattern matches, otherwise runs the else block
//    - The else block must leave the scope (break, return, continue)
//
// 3. What does tokio::select! do?
//    - Polls several futures at once and runs the branch of whichever
//      finishes first; the others are dropped
//    - Here: the politeness sleep races the stop signal
//
// 4. Why Arc<AtomicBool> plus Notify in StopHandle?
//    - The flag answers "has anyone asked us to stop?" at any time
//    - Notify wakes a task that is currently sleeping on it
//    - Arc lets the Ctrl-C task and the crawler share the same value
//
// 5. Why is discover() not async?
//    - scraper's Html type is not Send
//    - Holding one across .await would make the whole run() future !Send
//    - Doing the parsing in a plain fn keeps it out of the async state
//
// 6. Why is a redirect not simply followed?
//    - reqwest would fetch the new URL without asking robots.txt
//    - It could also land on a page we already have, or on another site
//    - Putting the Location back into the frontier reuses every check
// -----------------------------------------------------------------------------
