//! LogFileSink - appends records to the newline-delimited JSON log
//!
//! The only writer of the record log. Each record is encoded, terminated with
//! `\n` and written with a single `write_all`, so concurrent readers see
//! either a whole line or an unterminated tail.
//!
//! A failed write is truncated back to the last complete line. An
//! unterminated tail left by anyone else is closed with `\n` before the next
//! record, so it stays a single malformed line and never swallows ours.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, Record, RecordSink};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;

/// Persistence writer for the record log
pub struct LogFileSink {
    name: String,
    path: PathBuf,
    file: File,
    line: Vec<u8>,
    /// File length after our last complete write
    written_len: Option<u64>,
}

impl LogFileSink {
    /// Open `path` for append, creating it and its parent directories
    ///
    /// # Errors
    /// `DispatcherError::LogOpen` when the directory or file cannot be created
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, DispatcherError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DispatcherError::log_open(&path, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| DispatcherError::log_open(&path, e))?;

        let existing = file.metadata().map(|m| m.len()).unwrap_or_default();
        info!(path = %path.display(), existing_bytes = existing, "Record log opened");

        Ok(Self {
            name: name.into(),
            path,
            file,
            line: Vec::with_capacity(64),
            written_len: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, record: &Record) -> std::io::Result<()> {
        let len = self.file.metadata()?.len();

        self.line.clear();
        if self.written_len != Some(len) && !self.ends_with_newline(len)? {
            warn!(path = %self.path.display(), len, "Terminating partial line in record log");
            self.line.push(b'\n');
        }
        serde_json::to_writer(&mut self.line, record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.line.push(b'\n');

        if let Err(e) = self.file.write_all(&self.line) {
            self.written_len = None;
            if let Err(truncate) = self.file.set_len(len) {
                warn!(path = %self.path.display(), error = %truncate, "Failed to drop torn line");
            }
            return Err(e);
        }
        self.written_len = Some(len + self.line.len() as u64);
        Ok(())
    }

    fn ends_with_newline(&mut self, len: u64) -> std::io::Result<bool> {
        if len == 0 {
            return Ok(true);
        }
        let mut last = [0u8; 1];
        self.file.seek(SeekFrom::Start(len - 1))?;
        self.file.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }
}

impl RecordSink for LogFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_file_sink_write",
        skip(self, record),
        fields(sink = %self.name, record_ts = record.timestamp())
    )]
    async fn write(&mut self, record: &Record) -> Result<(), ContractError> {
        self.append(record).map_err(|e| {
            ContractError::sink_write(&self.name, format!("{}: {e}", self.path.display()))
        })
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.file
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "log_file_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.file
            .sync_data()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(path = %self.path.display(), "Record log closed");
        Ok(())
    }
}
