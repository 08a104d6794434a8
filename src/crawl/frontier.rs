// src/crawl/frontier.rs
// =============================================================================
// The frontier: pending work for a breadth-first crawl.
//
// How it works:
// 1. The seed goes in first at depth 0
// 2. Pages are taken from the front of the queue (oldest first)
// 3. Links found on a page go to the back at depth + 1
// Because the queue is strictly FIFO, every page at depth d is taken
// before any page at depth d + 1.
//
// Deduplication:
// - A URL is marked as seen the moment it is queued, not when it is fetched
// - So a page linked from ten parents is still queued exactly once
// - The seen set never shrinks; nothing is visited twice in one run
// =============================================================================

use crate::normalize::normalize;
use std::collections::{HashSet, VecDeque};
use url::Url;

// A URL waiting to be crawled, with its distance from the seed.
// Fields are private so a target can only exist in normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    url: Url,
    depth: usize,
}

impl CrawlTarget {
    pub fn new(url: Url, depth: usize) -> Self {
        // Normalizing here means every later comparison is on canonical URLs
        Self {
            url: normalize(url),
            depth,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    // Pending work, oldest at the front
    queue: VecDeque<CrawlTarget>,
    // Normalized URLs ever queued, fetched or not
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    // Queues the target unless its URL was seen before.
    // Returns true when the target was actually added.
    pub fn enqueue(&mut self, target: CrawlTarget) -> bool {
        // insert() is the membership test and the mark in one step:
        // it returns false when the URL was already there
        if !self.seen.insert(target.url.as_str().to_owned()) {
            return false;
        }

        // New URL: goes to the back, behind everything found earlier
        self.queue.push_back(target);
        true
    }

    // Takes the oldest pending target.
    // None means the crawl has nothing left to do.
    pub fn dequeue(&mut self) -> Option<CrawlTarget> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    // Number of targets still waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    // Number of distinct URLs ever queued
    pub fn seen(&self) -> usize {
        self.seen.len()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why store the URL as a String in the seen set?
//    - Url does implement Hash, but the serialized form is what we compare
//    - After normalize() two equal URLs always serialize identically
//
// 2. What does HashSet::insert return?
//    - true if the value was not in the set yet (and now is)
//    - false if it was already there (the set is unchanged)
//    - So one call both checks and marks, with no window in between
//
// 3. Why mark URLs when they are queued and not when they are fetched?
//    - A popular page is linked from many parents
//    - Marking at fetch time would queue it once per parent
//    - Marking at queue time keeps the queue free of duplicates
//
// 4. Why does the frontier not know about max_depth or max_pages?
//    - It only answers "new or not?" and "what is next?"
//    - The crawl engine owns the limits and decides what to offer
// -----------------------------------------------------------------------------
