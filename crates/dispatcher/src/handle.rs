//! SinkHandle - manages a sink with its own durable queue and worker task
//!
//! The queue is unbounded: a record handed to [`SinkHandle::send`] is only
//! lost if the worker itself is gone or the drain deadline passes at shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Record, RecordSink};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to send records to worker
    tx: mpsc::UnboundedSender<Record>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: RecordSink + 'static>(sink: S) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a record (never blocks)
    ///
    /// Returns false only if the worker has stopped.
    pub fn send(&self, record: Record) -> bool {
        self.metrics.inc_queue_len();
        match self.tx.send(record) {
            Ok(()) => true,
            Err(mpsc::error::SendError(record)) => {
                self.metrics.dec_queue_len();
                self.metrics.inc_dropped_count();
                error!(
                    sink = %self.name,
                    record_ts = record.timestamp(),
                    "Sink worker closed unexpectedly, record dropped"
                );
                false
            }
        }
    }

    /// Drain the queue and stop the worker
    ///
    /// Returns false when the worker did not finish before `drain_timeout`;
    /// whatever was still queued is abandoned.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self, drain_timeout: Duration) -> bool {
        // Dropping the sender lets the worker exit once the queue is empty
        drop(self.tx);
        let mut worker = self.worker_handle;

        match tokio::time::timeout(drain_timeout, &mut worker).await {
            Ok(Ok(())) => {
                debug!(sink = %self.name, "SinkHandle shutdown complete");
                true
            }
            Ok(Err(e)) => {
                error!(sink = %self.name, error = ?e, "Worker task panicked");
                false
            }
            Err(_) => {
                warn!(
                    sink = %self.name,
                    pending = self.metrics.queue_len(),
                    drain_timeout_ms = drain_timeout.as_millis() as u64,
                    "Drain deadline passed, abandoning queued records"
                );
                worker.abort();
                false
            }
        }
    }
}

/// Worker task that consumes records and writes to sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: RecordSink>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<Record>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(record) = rx.recv().await {
        metrics.dec_queue_len();

        match sink.write(&record).await {
            Ok(()) => {
                metrics.inc_write_count();
                observability::metrics::record_record_dispatched(&name, true);
            }
            Err(e) => {
                metrics.inc_failure_count();
                observability::metrics::record_record_dispatched(&name, false);
                error!(
                    sink = %name,
                    record_ts = record.timestamp(),
                    value = record.value(),
                    error = %e,
                    "Write failed, record dropped"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}
