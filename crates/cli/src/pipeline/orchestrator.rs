//! Pipeline orchestrator - coordinates all components.
//!
//! upstream -> connector -> dispatcher -> record log + live subscribers,
//! with the HTTP surface reading both.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{FrameSource, RelayConfig};
use dispatcher::{DispatcherBuilder, DispatcherConfig};
use history::LogReader;
use ingestion::{ConnectorConfig, UpstreamConnector, WebSocketSource};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::PipelineStats;
use crate::server::{self, AppState};

/// Extra time granted to the dispatcher beyond its own drain deadline
const DISPATCHER_GRACE: Duration = Duration::from_secs(1);
const SERVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated relay configuration
    pub relay: RelayConfig,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Serve `/messages`, `/stream` and `/health`
    pub serve_http: bool,

    /// Also trace every record through a log sink
    pub trace_records: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run against the configured WebSocket upstream until `shutdown`
    pub async fn run(self, shutdown: CancellationToken) -> Result<PipelineStats> {
        let source = WebSocketSource::new(self.config.relay.upstream.url.clone());
        self.run_with_source(source, shutdown).await
    }

    /// Run against any frame source until `shutdown`
    pub async fn run_with_source<S>(
        self,
        source: S,
        shutdown: CancellationToken,
    ) -> Result<PipelineStats>
    where
        S: FrameSource + 'static,
    {
        let start_time = Instant::now();
        let relay = &self.config.relay;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let (record_tx, record_rx) = mpsc::channel(relay.upstream.ingest_queue_capacity);

        // Failing to open the record log aborts startup
        let dispatcher_config =
            DispatcherConfig::from_relay(relay).with_trace_records(self.config.trace_records);
        let dispatcher = DispatcherBuilder::new(dispatcher_config, record_rx)
            .build()
            .await
            .context("Failed to open record log")?;
        let live = dispatcher.live();

        let listener = if self.config.serve_http {
            Some(
                server::bind(&relay.server.bind_addr)
                    .await
                    .context("Failed to start HTTP server")?,
            )
        } else {
            None
        };

        let drain_timeout = relay.persistence.drain_timeout();
        let dispatcher_handle = dispatcher.spawn();

        let connector = UpstreamConnector::new(
            source,
            ConnectorConfig::from(&relay.upstream),
            record_tx,
        );
        let connector_state = connector.state();
        let ingestion_metrics = connector.metrics();
        let connector_handle = connector.spawn(shutdown.clone());

        let server_handle = listener.map(|listener| {
            let state = AppState {
                reader: LogReader::new(relay.persistence.log_path.clone()),
                live: live.clone(),
                connector: connector_state,
                shutdown: shutdown.clone(),
            };
            tokio::spawn(server::serve(listener, state, shutdown.clone()))
        });

        info!(
            upstream = %relay.upstream.url,
            log_path = %relay.persistence.log_path.display(),
            http = self.config.serve_http,
            "Relay running"
        );

        // The connector only returns on shutdown or a fatal error
        match connector_handle.await {
            Ok(Ok(())) => info!("Connector stopped"),
            Ok(Err(e)) => {
                error!(error = %e, "Connector failed");
                shutdown.cancel();
            }
            Err(e) => {
                error!(error = %e, "Connector task panicked");
                shutdown.cancel();
            }
        }

        // Connector dropped its sender; the dispatcher drains and exits
        live.close();
        let dispatch = match tokio::time::timeout(drain_timeout + DISPATCHER_GRACE, dispatcher_handle)
            .await
        {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                error!(error = %e, "Dispatcher task panicked");
                None
            }
            Err(_) => {
                warn!("Dispatcher did not stop before the deadline");
                None
            }
        };

        if let Some(handle) = server_handle {
            match tokio::time::timeout(SERVER_SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
                Ok(Ok(Err(e))) => warn!(error = %e, "HTTP server error"),
                Ok(Err(e)) => warn!(error = %e, "HTTP server task panicked"),
                Err(_) => warn!("HTTP server did not stop in time"),
            }
        }

        Ok(PipelineStats {
            duration: start_time.elapsed(),
            ingestion: ingestion_metrics.snapshot(),
            dispatch,
        })
    }
}
