//! LogSink - traces each record

use contracts::{ContractError, Record, RecordSink};
use tracing::{info, instrument};

/// Sink that logs every record for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RecordSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_write", skip(self, record), fields(sink = %self.name))]
    async fn write(&mut self, record: &Record) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            record_ts = record.timestamp(),
            value = record.value(),
            "Record"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
