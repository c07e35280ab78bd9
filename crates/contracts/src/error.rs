//! Layered error definitions
//!
//! Categorized by source: config / upstream / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Upstream Errors =====
    /// Connection attempt failed or timed out
    #[error("upstream connect error for '{endpoint}': {message}")]
    UpstreamConnect { endpoint: String, message: String },

    /// Read failure on an established connection
    #[error("upstream read error for '{endpoint}': {message}")]
    UpstreamRead { endpoint: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create upstream connect error
    pub fn upstream_connect(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamConnect {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create upstream read error
    pub fn upstream_read(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamRead {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// True for configuration errors (startup-fatal)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. }
        )
    }
}
