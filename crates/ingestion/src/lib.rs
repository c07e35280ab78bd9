//! # Ingestion
//!
//! Upstream side of the relay.
//!
//! Responsibilities:
//! - Keep one connection to the upstream feed, reconnecting after a fixed delay
//! - Validate every frame into a `Record` or a `RejectionReason`
//! - Forward accepted records, in arrival order, to a bounded channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ConnectorConfig, UpstreamConnector, WebSocketSource};
//! use tokio_util::sync::CancellationToken;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(1024);
//! let source = WebSocketSource::new("ws://localhost:8080/feed");
//! let shutdown = CancellationToken::new();
//! let handle = UpstreamConnector::new(source, ConnectorConfig::default(), tx)
//!     .spawn(shutdown.clone());
//!
//! while let Some(record) = rx.recv().await {
//!     // hand over to the dispatcher
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{ScriptedSource, Session, SessionClose};
//!
//! let source = ScriptedSource::new("mock://feed")
//!     .refuse()
//!     .session(Session::text(&[r#"{"timestamp":1,"value":2}"#], SessionClose::Normal));
//! ```

mod config;
mod connector;
mod error;
mod mock;
mod validator;
mod ws_source;

// Re-exports
pub use config::{ConnectorConfig, IngestionMetrics, MetricsSnapshot};
pub use connector::{ConnectorState, UpstreamConnector};
pub use contracts::{Record, RejectionReason};
pub use error::{IngestionError, Result};
pub use mock::{ScriptHandle, ScriptedSource, Session, SessionClose};
pub use validator::validate;
pub use ws_source::WebSocketSource;
