//! Upstream connector
//!
//! Owns the connect / read / reconnect loop against one [`FrameSource`]:
//!
//! ```text
//! Disconnected -> Connecting -> Reading -> Disconnected -> (delay) -> Connecting -> ...
//!                                                       \-> Stopped (shutdown only)
//! ```
//!
//! Every frame goes through the validator; accepted records are sent to the
//! output channel in arrival order. Only one connection attempt or read loop
//! exists at a time because the whole machine runs in a single task.

use std::fmt;
use std::sync::Arc;

use contracts::{ContractError, FrameSource, RawFrame, Record};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{ConnectorConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};
use crate::validator::validate;

/// Connector lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Reading,
    Stopped,
}

impl ConnectorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Reading => "reading",
            Self::Stopped => "stopped",
        }
    }

    /// Numeric code exported as a gauge
    pub fn code(&self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Reading => 2,
            Self::Stopped => 3,
        }
    }
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a read session ended
enum SessionEnd {
    Shutdown,
    ServerClosed,
    Failed(ContractError),
    OutputClosed,
}

/// Upstream connector
pub struct UpstreamConnector<S> {
    source: S,
    config: ConnectorConfig,
    output: mpsc::Sender<Record>,
    state_tx: watch::Sender<ConnectorState>,
    metrics: Arc<IngestionMetrics>,
}

impl<S: FrameSource> UpstreamConnector<S> {
    /// Create a connector feeding `output`
    pub fn new(source: S, config: ConnectorConfig, output: mpsc::Sender<Record>) -> Self {
        let (state_tx, _) = watch::channel(ConnectorState::Disconnected);
        Self {
            source,
            config,
            output,
            state_tx,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Share an existing metrics instance
    pub fn with_metrics(mut self, metrics: Arc<IngestionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Subscribe to state transitions
    pub fn state(&self) -> watch::Receiver<ConnectorState> {
        self.state_tx.subscribe()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Run until `shutdown` is cancelled
    ///
    /// Upstream failures never end the loop. Returns an error only when the
    /// output receiver is gone.
    #[instrument(name = "upstream_connector", skip_all, fields(endpoint = %self.source.endpoint()))]
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            reconnect_delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "Upstream connector started"
        );

        let outcome = self.drive(&shutdown).await;

        self.source.close().await;
        self.set_state(ConnectorState::Stopped);
        info!(metrics = ?self.metrics.snapshot(), "Upstream connector stopped");
        outcome
    }

    /// Spawn onto the runtime
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<Result<()>>
    where
        S: 'static,
    {
        tokio::spawn(self.run(shutdown))
    }

    async fn drive(&mut self, shutdown: &CancellationToken) -> Result<()> {
        while !shutdown.is_cancelled() {
            self.set_state(ConnectorState::Connecting);
            self.metrics.record_connect_attempt();

            let connected = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                result = self.connect() => result,
            };

            match connected {
                Ok(()) => {
                    self.set_state(ConnectorState::Reading);
                    info!("Upstream connected");

                    let end = self.read_frames(shutdown).await;
                    self.source.close().await;

                    match end {
                        SessionEnd::Shutdown => return Ok(()),
                        SessionEnd::OutputClosed => return Err(IngestionError::OutputClosed),
                        SessionEnd::ServerClosed => info!("Upstream closed the connection"),
                        SessionEnd::Failed(e) => warn!(error = %e, "Upstream read failed"),
                    }
                }
                Err(e) => warn!(error = %e, "Upstream connect failed"),
            }

            self.set_state(ConnectorState::Disconnected);
            self.metrics.record_reconnect();
            observability::metrics::record_upstream_reconnect();
            debug!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Waiting before reconnect"
            );

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
        Ok(())
    }

    async fn connect(&mut self) -> std::result::Result<(), ContractError> {
        let Some(limit) = self.config.connect_timeout else {
            return self.source.connect().await;
        };

        let attempt = tokio::time::timeout(limit, self.source.connect()).await;
        match attempt {
            Ok(result) => result,
            Err(_) => Err(ContractError::upstream_connect(
                self.source.endpoint(),
                format!("handshake timed out after {}ms", limit.as_millis()),
            )),
        }
    }

    async fn read_frames(&mut self, shutdown: &CancellationToken) -> SessionEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                next = self.source.next_frame() => next,
            };

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => return SessionEnd::ServerClosed,
                Err(e) => return SessionEnd::Failed(e),
            };

            let Some(record) = self.accept(frame) else {
                continue;
            };

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                sent = self.output.send(record) => {
                    if sent.is_err() {
                        return SessionEnd::OutputClosed;
                    }
                }
            }
        }
    }

    /// Validate one frame; rejections are logged and dropped
    fn accept(&self, frame: RawFrame) -> Option<Record> {
        self.metrics.record_frame();
        observability::metrics::record_frame_received();

        let Some(text) = frame.as_text() else {
            self.metrics.record_unsupported();
            observability::metrics::record_frame_unsupported();
            warn!(bytes = frame.len(), "Binary frame dropped");
            return None;
        };

        match validate(text) {
            Ok(record) => {
                self.metrics.record_accepted();
                observability::metrics::record_record_accepted();
                trace!(
                    record_ts = record.timestamp(),
                    value = record.value(),
                    "Record accepted"
                );
                Some(record)
            }
            Err(reason) => {
                self.metrics.record_rejected();
                observability::metrics::record_record_rejected(&reason);
                warn!(reason = reason.kind(), error = %reason, "Frame rejected");
                None
            }
        }
    }

    fn set_state(&self, state: ConnectorState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connector state changed");
            observability::metrics::record_connector_state(state.code());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::{ScriptedSource, Session, SessionClose};

    fn config(delay_ms: u64) -> ConnectorConfig {
        ConnectorConfig::new(Duration::from_millis(delay_ms)).with_connect_timeout(None)
    }

    #[tokio::test]
    async fn test_forwards_accepted_records_in_order() {
        let source = ScriptedSource::new("mock://feed").session(Session::text(
            &[
                r#"{"timestamp": 1, "value": 10}"#,
                r#"{"timestamp": 2, "value": 20}"#,
                r#"{"timestamp": 3, "value": 30}"#,
            ],
            SessionClose::Hang,
        ));
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let handle = UpstreamConnector::new(source, config(10), tx).spawn(shutdown.clone());

        for expected in 1..=3 {
            let record = rx.recv().await.unwrap();
            assert_eq!(record.timestamp(), expected);
            assert_eq!(record.value(), expected * 10);
        }

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_rejections_are_dropped_and_counted() {
        let source = ScriptedSource::new("mock://feed").session(Session::frames(
            vec![
                RawFrame::Binary(vec![1u8, 2, 3].into()),
                RawFrame::from("garbage"),
                RawFrame::from(r#"{"timestamp": 0, "value": 1}"#),
                RawFrame::from(r#"{"timestamp": 1000, "value": -5}"#),
                RawFrame::from(r#"{"timestamp": 1000, "value": 5}"#),
            ],
            SessionClose::Hang,
        ));
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let connector = UpstreamConnector::new(source, config(10), tx);
        let metrics = connector.metrics();
        let handle = connector.spawn(shutdown.clone());

        let record = rx.recv().await.unwrap();
        assert_eq!(record, Record::new(1000, 5).unwrap());

        shutdown.cancel();
        handle.await.unwrap().unwrap();
        assert!(rx.recv().await.is_none());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_received, 5);
        assert_eq!(snapshot.records_accepted, 1);
        assert_eq!(snapshot.records_rejected, 3);
        assert_eq!(snapshot.unsupported_frames, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay() {
        let source = ScriptedSource::new("mock://feed")
            .session(Session::text(
                &[r#"{"timestamp": 1, "value": 1}"#],
                SessionClose::Error,
            ))
            .session(Session::text(
                &[r#"{"timestamp": 2, "value": 2}"#],
                SessionClose::Hang,
            ));
        let script = source.handle();
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let handle = UpstreamConnector::new(source, config(5_000), tx).spawn(shutdown.clone());

        assert_eq!(rx.recv().await.unwrap().timestamp(), 1);
        assert_eq!(rx.recv().await.unwrap().timestamp(), 2);

        let times = script.connect_times();
        assert_eq!(times.len(), 2);
        let gap = times[1] - times[0];
        assert!(gap >= Duration::from_millis(5_000), "gap {gap:?}");
        assert!(gap < Duration::from_millis(5_100), "gap {gap:?}");

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connect_is_retried() {
        let source = ScriptedSource::new("mock://feed")
            .refuse()
            .refuse()
            .session(Session::text(
                &[r#"{"timestamp": 9, "value": 9}"#],
                SessionClose::Hang,
            ));
        let script = source.handle();
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let handle = UpstreamConnector::new(source, config(1_000), tx).spawn(shutdown.clone());

        assert_eq!(rx.recv().await.unwrap().timestamp(), 9);
        assert_eq!(script.connects(), 3);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_triggers_reconnect() {
        let source = ScriptedSource::new("mock://feed")
            .session(Session::text(&[], SessionClose::Normal))
            .session(Session::text(
                &[r#"{"timestamp": 4, "value": 4}"#],
                SessionClose::Hang,
            ));
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let handle = UpstreamConnector::new(source, config(100), tx).spawn(shutdown.clone());

        assert_eq!(rx.recv().await.unwrap().timestamp(), 4);
        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_reconnect_delay() {
        let source = ScriptedSource::new("mock://feed").refuse();
        let script = source.handle();
        let (tx, _rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let connector = UpstreamConnector::new(source, config(60_000), tx);
        let mut state = connector.state();
        let handle = connector.spawn(shutdown.clone());

        state
            .wait_for(|s| *s == ConnectorState::Disconnected && script.connects() == 1)
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(*state.borrow(), ConnectorState::Stopped);
        assert_eq!(script.connects(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_blocked_read() {
        let source = ScriptedSource::new("mock://feed")
            .session(Session::text(&[], SessionClose::Hang));
        let (tx, _rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let connector = UpstreamConnector::new(source, config(10), tx);
        let mut state = connector.state();
        let handle = connector.spawn(shutdown.clone());

        state
            .wait_for(|s| *s == ConnectorState::Reading)
            .await
            .unwrap();
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("connector did not stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_output_closed_ends_task() {
        let source = ScriptedSource::new("mock://feed").session(Session::text(
            &[r#"{"timestamp": 1, "value": 1}"#],
            SessionClose::Hang,
        ));
        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        let result = UpstreamConnector::new(source, config(10), tx)
            .run(CancellationToken::new())
            .await;
        assert!(matches!(result, Err(IngestionError::OutputClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_counts_as_failure() {
        let source = ScriptedSource::new("mock://feed")
            .stall()
            .session(Session::text(
                &[r#"{"timestamp": 7, "value": 7}"#],
                SessionClose::Hang,
            ));
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let config = ConnectorConfig::new(Duration::from_millis(100))
            .with_connect_timeout(Some(Duration::from_millis(500)));
        let metrics = Arc::new(IngestionMetrics::new());
        let handle = UpstreamConnector::new(source, config, tx)
            .with_metrics(Arc::clone(&metrics))
            .spawn(shutdown.clone());

        assert_eq!(rx.recv().await.unwrap().timestamp(), 7);
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connect_attempts, 2);
        assert_eq!(snapshot.reconnects, 1);
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(ConnectorState::Disconnected.code(), 0);
        assert_eq!(ConnectorState::Reading.to_string(), "reading");
    }
}
