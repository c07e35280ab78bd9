//! History error types

use std::path::PathBuf;

use thiserror::Error;

/// Historical query errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Log exists but cannot be read
    #[error("cannot read record log {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bound is neither epoch milliseconds nor RFC 3339
    #[error("invalid time bound '{input}': {message}")]
    InvalidBound { input: String, message: String },

    /// Relative window is not `<N><unit>`
    #[error("invalid window '{input}': {message}")]
    InvalidWindow { input: String, message: String },

    /// `last` combined with explicit bounds
    #[error("'last' cannot be combined with 'start' or 'end'")]
    ConflictingBounds,
}

impl HistoryError {
    pub fn invalid_bound(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBound {
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn invalid_window(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidWindow {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Caller supplied a bad parameter (as opposed to an I/O failure)
    pub fn is_bad_request(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

/// History Result type alias
pub type Result<T> = std::result::Result<T, HistoryError>;
