//! Dispatcher - main loop for fan-out to persistence and live subscribers

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{Record, RelayConfig};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::live::LivePublisher;
use crate::metrics::{LiveSnapshot, MetricsSnapshot, SinkMetrics};
use crate::sinks::{LogFileSink, LogSink};

/// Name of the persistence sink in logs and metrics
pub const RECORD_LOG_SINK: &str = "record_log";

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Append-only record log
    pub log_path: PathBuf,
    /// Per-subscriber live buffer
    pub subscriber_buffer: usize,
    /// Bound on draining the persistence queue at shutdown
    pub drain_timeout: Duration,
    /// Also trace every record through a `LogSink`
    pub trace_records: bool,
}

impl DispatcherConfig {
    pub fn from_relay(config: &RelayConfig) -> Self {
        Self {
            log_path: config.persistence.log_path.clone(),
            subscriber_buffer: config.live.subscriber_buffer,
            drain_timeout: config.persistence.drain_timeout(),
            trace_records: false,
        }
    }

    pub fn with_trace_records(mut self, enabled: bool) -> Self {
        self.trace_records = enabled;
        self
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<Record>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<Record>) -> Self {
        Self { config, input_rx }
    }

    /// Open the record log and start the sink workers
    ///
    /// # Errors
    /// Fails when the record log cannot be created.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(log_path = %self.config.log_path.display())
    )]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config)?;

        Ok(Dispatcher {
            handles,
            live: LivePublisher::new(self.config.subscriber_buffer),
            input_rx: self.input_rx,
            drain_timeout: self.config.drain_timeout,
        })
    }

    fn initialize_handles(config: &DispatcherConfig) -> Result<Vec<SinkHandle>, DispatcherError> {
        let log_sink = LogFileSink::open(RECORD_LOG_SINK, &config.log_path)?;
        let mut handles = vec![SinkHandle::spawn(log_sink)];

        if config.trace_records {
            handles.push(SinkHandle::spawn(LogSink::new("record_trace")));
        }
        Ok(handles)
    }
}

/// Fans every accepted record out to the sinks and the live publisher
///
/// Never awaits a consumer: sink queues are unbounded and the live publisher
/// evicts instead of waiting.
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    live: LivePublisher,
    input_rx: mpsc::Receiver<Record>,
    drain_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        live: LivePublisher,
        input_rx: mpsc::Receiver<Record>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            handles,
            live,
            input_rx,
            drain_timeout,
        }
    }

    /// Live publisher handle, for attaching subscribers
    pub fn live(&self) -> LivePublisher {
        self.live.clone()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns when the input channel is closed, after live subscriptions are
    /// ended and the sink queues drained (bounded by the drain timeout).
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchReport {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut records: u64 = 0;

        while let Some(record) = self.input_rx.recv().await {
            records += 1;
            self.dispatch(record);

            if records.is_multiple_of(1000) {
                debug!(records, "Dispatcher progress");
            }
        }

        info!(records, "Dispatcher input closed, shutting down");

        self.live.close();
        let sink_metrics: Vec<(String, Arc<SinkMetrics>)> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();
        let drained = Self::shutdown_handles(self.handles, self.drain_timeout).await;
        let sinks = sink_metrics
            .into_iter()
            .map(|(name, metrics)| (name, metrics.snapshot()))
            .collect();

        info!(drained, "Dispatcher shutdown complete");
        DispatchReport {
            records,
            drained,
            sinks,
            live: self.live.metrics(),
        }
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run())
    }

    fn dispatch(&self, record: Record) {
        for handle in &self.handles {
            handle.send(record);
        }
        self.live.publish(record);
    }

    /// All handles share one drain deadline
    async fn shutdown_handles(handles: Vec<SinkHandle>, drain_timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + drain_timeout;
        let mut drained = true;

        for handle in handles {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if !handle.shutdown(remaining).await {
                drained = false;
            }
        }

        if !drained {
            warn!("Some sink queues were not fully drained");
        }
        drained
    }
}

/// Summary returned when the dispatcher stops
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Records received from the input channel
    pub records: u64,
    /// Every sink queue drained before the deadline
    pub drained: bool,
    /// Sink metrics after draining
    pub sinks: Vec<(String, MetricsSnapshot)>,
    pub live: LiveSnapshot,
}
