//! Record log reader
//!
//! Every query opens its own read-only handle and scans the log front to
//! back. Lines that do not parse are logged and skipped. An unterminated
//! final line is a write in progress and is not returned.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use contracts::Record;
use tracing::{debug, warn};

use crate::error::{HistoryError, Result};
use crate::range::RangeQuery;

/// Counters for one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Complete lines read
    pub scanned: u64,
    /// Records returned
    pub matched: u64,
    /// Lines that did not parse
    pub skipped: u64,
}

/// Read side of the record log
#[derive(Debug, Clone)]
pub struct LogReader {
    path: PathBuf,
}

impl LogReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a lazy scan for records inside `range`
    ///
    /// A missing log or an empty range yields an empty scan.
    ///
    /// # Errors
    /// `HistoryError::Io` when the log exists but cannot be opened
    pub fn query(&self, range: RangeQuery) -> Result<RecordScan> {
        if range.is_empty() {
            return Ok(RecordScan::empty(range));
        }

        match File::open(&self.path) {
            Ok(file) => Ok(RecordScan::new(BufReader::new(file), range)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Record log not found, empty result");
                Ok(RecordScan::empty(range))
            }
            Err(source) => Err(HistoryError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Convenience: `query(RangeQuery::new(start, end))`
    pub fn query_between(&self, start: i64, end: i64) -> Result<RecordScan> {
        self.query(RangeQuery::new(start, end))
    }
}

/// Lazy, single-pass scan over the log
pub struct RecordScan {
    reader: Option<Box<dyn BufRead + Send>>,
    range: RangeQuery,
    line: Vec<u8>,
    stats: ScanStats,
}

impl RecordScan {
    fn new(reader: impl BufRead + Send + 'static, range: RangeQuery) -> Self {
        Self {
            reader: Some(Box::new(reader)),
            range,
            line: Vec::with_capacity(64),
            stats: ScanStats::default(),
        }
    }

    fn empty(range: RangeQuery) -> Self {
        Self {
            reader: None,
            range,
            line: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    pub fn range(&self) -> RangeQuery {
        self.range
    }

    /// Counters so far
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn finish(&mut self) {
        if self.reader.take().is_some() {
            observability::metrics::record_query_scan(self.stats.scanned, self.stats.skipped);
            debug!(
                start = self.range.start,
                end = self.range.end,
                scanned = self.stats.scanned,
                matched = self.stats.matched,
                skipped = self.stats.skipped,
                "Record log scan finished"
            );
        }
    }

    fn parse_line(&mut self) -> Option<Record> {
        let line_no = self.stats.scanned;
        let text = match std::str::from_utf8(&self.line) {
            Ok(text) => text.trim(),
            Err(e) => {
                self.stats.skipped += 1;
                warn!(line = line_no, error = %e, "Skipping non UTF-8 log line");
                return None;
            }
        };

        if text.is_empty() {
            return None;
        }

        match serde_json::from_str::<Record>(text) {
            Ok(record) => Some(record),
            Err(e) => {
                self.stats.skipped += 1;
                warn!(line = line_no, error = %e, "Skipping malformed log line");
                None
            }
        }
    }
}

impl Iterator for RecordScan {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            let reader = self.reader.as_mut()?;
            self.line.clear();

            match reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.finish();
                    return None;
                }
                Ok(_) if self.line.last() != Some(&b'\n') => {
                    // Tail still being written
                    self.finish();
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Record log read failed, ending scan");
                    self.finish();
                    return None;
                }
            }

            self.stats.scanned += 1;
            if let Some(record) = self.parse_line() {
                if self.range.contains(record.timestamp()) {
                    self.stats.matched += 1;
                    return Some(record);
                }
            }
        }
    }
}
