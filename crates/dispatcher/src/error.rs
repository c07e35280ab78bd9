//! Dispatcher error types

use std::path::PathBuf;

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Log file could not be created or opened for append
    #[error("cannot open record log {}: {source}", path.display())]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sink error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn log_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LogOpen {
            path: path.into(),
            source,
        }
    }
}
