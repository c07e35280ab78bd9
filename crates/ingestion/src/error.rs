//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
///
/// Upstream failures are normally absorbed by the reconnect loop; only errors
/// that end the connector task surface here.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Upstream transport error
    #[error(transparent)]
    Upstream(#[from] ContractError),

    /// Downstream receiver dropped while records were still flowing
    #[error("record output channel closed")]
    OutputClosed,
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
