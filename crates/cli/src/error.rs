//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or is invalid
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Record log location could not be determined
    #[error("No record log given: pass --log or a config with persistence.log_path")]
    LogPathMissing,

    /// HTTP server failed to start
    #[error("Failed to bind HTTP server on {addr}: {message}")]
    ServerBind { addr: String, message: String },

    /// Historical query failed
    #[error("Query failed: {0}")]
    Query(#[from] history::HistoryError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn server_bind(addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServerBind {
            addr: addr.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
