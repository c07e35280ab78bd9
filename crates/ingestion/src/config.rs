//! Connector configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::UpstreamConfig;

/// Connector runtime settings
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Fixed wait between a disconnect and the next connect attempt
    pub reconnect_delay: Duration,

    /// Upper bound on a single handshake (None = unbounded)
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(5_000),
            connect_timeout: Some(Duration::from_millis(10_000)),
        }
    }
}

impl ConnectorConfig {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            reconnect_delay,
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl From<&UpstreamConfig> for ConnectorConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frames received from upstream
    pub frames_received: AtomicU64,

    /// Frames that became records
    pub records_accepted: AtomicU64,

    /// Frames rejected by the validator
    pub records_rejected: AtomicU64,

    /// Binary frames dropped
    pub unsupported_frames: AtomicU64,

    /// Connect attempts (including the first)
    pub connect_attempts: AtomicU64,

    /// Disconnects followed by a reconnect wait
    pub reconnects: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsupported(&self) {
        self.unsupported_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            unsupported_frames: self.unsupported_frames.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub records_accepted: u64,
    pub records_rejected: u64,
    pub unsupported_frames: u64,
    pub connect_attempts: u64,
    pub reconnects: u64,
}
