// src/store/mod.rs
// =============================================================================
// Persistence: fetched pages on disk plus the crawl_log.csv audit trail.
//
// Layout of the output directory:
//   crawl_log.csv                         one row per visit, in visit order
//   example.com_docs_intro-3f9a1c0b2d4e.html
//   example.com_index-0a1b2c3d4e5f.html   one file per saved page
//
// File names are derived from the URL alone, so the same URL always maps to
// the same file. The readable part is the host and path; the hex suffix is a
// SHA-256 prefix of the full URL, which keeps /a?x=1 and /a?x=2 apart.
//
// The log is flushed after every row. Stopping the crawler at any point
// leaves a valid CSV file with complete rows only.
// =============================================================================

mod record;

pub use record::{VisitRecord, VisitStatus};

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const LOG_FILE_NAME: &str = "crawl_log.csv";
pub const LOG_HEADER: [&str; 6] = [
    "url",
    "status",
    "depth",
    "timestamp",
    "saved_path",
    "content_type",
];

// Longest readable part of a page file name, before the hash suffix
const MAX_NAME_LEN: usize = 120;
// Hex characters of the URL hash kept in file names
const HASH_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot create output directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write page file {path}: {source}")]
    Page {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write crawl log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

// Where log rows go; a File in practice
type LogWriter = csv::Writer<Box<dyn Write + Send>>;

pub struct Sink {
    dir: PathBuf,
    log_path: PathBuf,
    log: LogWriter,
}

impl Sink {
    // Creates the output directory and starts a fresh log with its header.
    // Failing here means the run cannot produce its audit trail at all.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SinkError::Directory {
            path: dir.clone(),
            source,
        })?;

        let log_path = dir.join(LOG_FILE_NAME);
        let log_error = |source: csv::Error| SinkError::Log {
            path: log_path.clone(),
            source,
        };

        let file = File::create(&log_path).map_err(|e| log_error(e.into()))?;
        let mut log = log_writer(Box::new(file));
        log.write_record(LOG_HEADER).map_err(log_error)?;
        log.flush().map_err(|e| log_error(e.into()))?;

        Ok(Self { dir, log_path, log })
    }

    // Writes a page body and returns where it went
    pub fn save_page(&self, url: &Url, body: &[u8]) -> Result<PathBuf, SinkError> {
        let path = self.dir.join(page_file_name(url));
        fs::write(&path, body).map_err(|source| SinkError::Page {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    // Appends one row and flushes it to disk
    pub fn append_log(&mut self, record: &VisitRecord) -> Result<(), SinkError> {
        let log_path = &self.log_path;
        self.log
            .write_record(record.csv_row())
            .map_err(|source| SinkError::Log {
                path: log_path.clone(),
                source,
            })?;
        self.log.flush().map_err(|e| SinkError::Log {
            path: log_path.clone(),
            source: e.into(),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    // Sends further rows somewhere else, e.g. a writer that always fails
    #[cfg(test)]
    pub fn replace_log_writer(&mut self, writer: impl Write + Send + 'static) {
        self.log = log_writer(Box::new(writer));
    }
}

// The header is written by hand in open(), so the csv crate must not add one
fn log_writer(writer: Box<dyn Write + Send>) -> LogWriter {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer)
}

// Deterministic file name for a page:
//   http://example.com/docs/intro?x=1 -> example.com_docs_intro-<hash>.html
pub fn page_file_name(url: &Url) -> String {
    let mut name = String::new();
    name.push_str(url.host_str().unwrap_or("unknown"));
    if let Some(port) = url.port() {
        name.push('_');
        name.push_str(&port.to_string());
    }
    name.push_str(&url.path().replace('/', "_"));

    // Anything outside a conservative character set becomes '_'
    let mut name: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.ends_with('_') {
        name.push_str("index");
    }
    // Pure ASCII at this point, so byte truncation is safe
    name.truncate(MAX_NAME_LEN);

    let digest = Sha256::digest(url.as_str().as_bytes());
    let hash: String = digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>();

    format!("{}-{}.html", name, &hash[..HASH_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::CrawlTarget;
    use tempfile::TempDir;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_page_file_name_is_readable_and_stable() {
        let name = page_file_name(&url("http://example.com/docs/intro"));
        assert!(name.starts_with("example.com_docs_intro-"), "{}", name);
        assert!(name.ends_with(".html"));
        assert_eq!(name, page_file_name(&url("http://example.com/docs/intro")));
    }

    #[test]
    fn test_root_page_is_named_index() {
        let name = page_file_name(&url("http://example.com/"));
        assert!(name.starts_with("example.com_index-"), "{}", name);
    }

    #[test]
    fn test_query_variants_get_distinct_files() {
        let a = page_file_name(&url("http://example.com/list?page=1"));
        let b = page_file_name(&url("http://example.com/list?page=2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_long_paths_are_truncated() {
        let long = format!("http://example.com/{}", "segment/".repeat(50));
        let name = page_file_name(&url(&long));
        assert!(name.len() <= MAX_NAME_LEN + 1 + HASH_LEN + ".html".len());
    }

    #[test]
    fn test_open_writes_header() {
        let dir = TempDir::new().unwrap();
        let sink = Sink::open(dir.path().join("out")).unwrap();

        let rows = read_rows(sink.log_path());
        assert_eq!(rows, vec![LOG_HEADER.map(String::from).to_vec()]);
    }

    #[test]
    fn test_append_log_in_order() {
        let dir = TempDir::new().unwrap();
        let mut sink = Sink::open(dir.path()).unwrap();

        let first = CrawlTarget::new(url("http://example.com/"), 0);
        let second = CrawlTarget::new(url("http://example.com/a"), 1);
        sink.append_log(&VisitRecord::new(&first, VisitStatus::Fetched(200)))
            .unwrap();
        sink.append_log(&VisitRecord::new(&second, VisitStatus::RobotsBlocked))
            .unwrap();

        let rows = read_rows(sink.log_path());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], "http://example.com/");
        assert_eq!(rows[2][0], "http://example.com/a");
        assert_eq!(rows[2][1], "robots_blocked");
    }

    #[test]
    fn test_open_truncates_previous_log() {
        let dir = TempDir::new().unwrap();
        {
            let mut sink = Sink::open(dir.path()).unwrap();
            let target = CrawlTarget::new(url("http://example.com/"), 0);
            sink.append_log(&VisitRecord::new(&target, VisitStatus::Fetched(200)))
                .unwrap();
        }

        let sink = Sink::open(dir.path()).unwrap();
        assert_eq!(read_rows(sink.log_path()).len(), 1);
    }

    #[test]
    fn test_save_page() {
        let dir = TempDir::new().unwrap();
        let sink = Sink::open(dir.path()).unwrap();

        let path = sink
            .save_page(&url("http://example.com/a"), b"<html></html>")
            .unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(fs::read(&path).unwrap(), b"<html></html>");
    }

    #[test]
    fn test_unwritable_directory_fails() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory should be; fails even as root
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = Sink::open(blocker.join("out")).err().unwrap();
        assert!(matches!(err, SinkError::Directory { .. }));
    }
}
