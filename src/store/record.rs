// src/store/record.rs
// =============================================================================
// One row of the crawl log.
//
// A VisitRecord is created for every fetch attempt (success or failure) and
// for every URL robots.txt kept us away from. Once written it never changes.
// =============================================================================

use crate::crawl::CrawlTarget;
use crate::fetch::FetchError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitStatus {
    /// Page downloaded; holds the final HTTP status
    Fetched(u16),
    /// Download failed
    FetchFailed(FetchError),
    /// Downloaded, but the page file could not be written
    SaveFailed,
    /// robots.txt disallows the URL, nothing was requested
    RobotsBlocked,
}

// How the status looks in the CSV "status" column:
//   200, 404, 503           plain HTTP status codes
//   error:timeout           failure kinds
//   robots_blocked          skipped
impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitStatus::Fetched(code) => write!(f, "{}", code),
            VisitStatus::FetchFailed(FetchError::HttpStatus(code)) => write!(f, "{}", code),
            VisitStatus::FetchFailed(e) => write!(f, "error:{}", e.kind()),
            VisitStatus::SaveFailed => write!(f, "error:io"),
            VisitStatus::RobotsBlocked => write!(f, "robots_blocked"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisitRecord {
    pub url: String,
    pub status: VisitStatus,
    pub depth: usize,
    pub timestamp: DateTime<Utc>,
    pub saved_path: Option<PathBuf>,
    pub content_type: Option<String>,
}

impl VisitRecord {
    pub fn new(target: &CrawlTarget, status: VisitStatus) -> Self {
        Self {
            url: target.url().to_string(),
            status,
            depth: target.depth(),
            timestamp: Utc::now(),
            saved_path: None,
            content_type: None,
        }
    }

    pub fn with_saved_path(mut self, path: PathBuf) -> Self {
        self.saved_path = Some(path);
        self
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    // Fields in LOG_HEADER order
    pub fn csv_row(&self) -> [String; 6] {
        [
            self.url.clone(),
            self.status.to_string(),
            self.depth.to_string(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.saved_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            self.content_type.clone().unwrap_or_default(),
        ]
    }
}
