//! RelayConfig - Config Loader output
//!
//! Describes the full relay configuration: upstream feed, record log,
//! live fan-out and the HTTP surface.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RelayConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Upstream feed settings
    #[serde(default)]
    #[validate(nested)]
    pub upstream: UpstreamConfig,

    /// Record log settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Live subscriber settings
    #[serde(default)]
    #[validate(nested)]
    pub live: LiveConfig,

    /// HTTP surface settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpstreamConfig {
    /// Upstream address (required), e.g. `ws://host:port/path`
    #[serde(default)]
    #[validate(length(min = 1, message = "upstream url is required"))]
    pub url: String,

    /// Fixed wait before reconnecting (milliseconds)
    #[serde(default = "default_reconnect_delay_ms")]
    #[validate(range(min = 1, message = "reconnect delay must be at least 1ms"))]
    pub reconnect_delay_ms: u64,

    /// Handshake timeout (milliseconds, 0 = no timeout)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Capacity of the connector -> distributor channel
    #[serde(default = "default_ingest_queue_capacity")]
    #[validate(range(min = 1, message = "queue capacity must be > 0"))]
    pub ingest_queue_capacity: usize,
}

impl UpstreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// `None` when the timeout is disabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            ingest_queue_capacity: default_ingest_queue_capacity(),
        }
    }
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_ingest_queue_capacity() -> usize {
    1024
}

/// Record log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Append-only log path (required)
    #[serde(default)]
    pub log_path: PathBuf,

    /// Upper bound for draining queued records on shutdown (milliseconds)
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl PersistenceConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::new(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

fn default_drain_timeout_ms() -> u64 {
    5_000
}

/// Live fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LiveConfig {
    /// Per-subscriber buffer; oldest records are dropped past this depth
    #[serde(default = "default_subscriber_buffer")]
    #[validate(range(min = 1, message = "subscriber buffer must be > 0"))]
    pub subscriber_buffer: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_subscriber_buffer() -> usize {
    256
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for `/messages`, `/stream` and `/health`
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}
