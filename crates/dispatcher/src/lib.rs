//! # Dispatcher
//!
//! Record distribution module.
//!
//! Responsibilities:
//! - Consume accepted `Record`s from the connector
//! - Persist every record, in order, through a durable queue
//! - Fan out to live subscribers with per-subscriber bounded buffers
//! - Never let a slow consumer stall ingestion

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod live;
pub mod metrics;
pub mod sinks;

pub use contracts::{Record, RecordSink};
pub use dispatcher::{
    DispatchReport, Dispatcher, DispatcherBuilder, DispatcherConfig, RECORD_LOG_SINK,
};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use live::{LivePublisher, SubscriberId, Subscription};
pub use metrics::{LiveMetrics, LiveSnapshot, MetricsSnapshot, SinkMetrics};
pub use sinks::{LogFileSink, LogSink};
