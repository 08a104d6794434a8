// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Breadth-first traversal starting from one seed URL
// - Depth and page-count limits
// - robots.txt compliance and a fixed delay between requests
// - Every visit recorded in crawl_log.csv, failures included
// - Redirects go back through the frontier instead of being followed blindly
//
// Submodules:
// - frontier: the FIFO queue and the seen-URL set
// - politeness: robots.txt and the request delay
// - engine: the loop tying fetching, saving and link discovery together
// =============================================================================

mod engine;
mod frontier;
mod politeness;

pub use engine::{CrawlReport, CrawlState, Crawler};
pub use frontier::CrawlTarget;
