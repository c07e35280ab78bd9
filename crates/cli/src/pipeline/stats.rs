//! Relay run statistics.

use std::time::Duration;

use dispatcher::{DispatchReport, RECORD_LOG_SINK};

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Connector counters
    pub ingestion: ingestion::MetricsSnapshot,

    /// Dispatcher report (None if the dispatcher did not stop in time)
    pub dispatch: Option<DispatchReport>,
}

impl PipelineStats {
    /// Records written to the record log
    pub fn records_persisted(&self) -> u64 {
        self.dispatch
            .as_ref()
            .and_then(|report| {
                report
                    .sinks
                    .iter()
                    .find(|(name, _)| name == RECORD_LOG_SINK)
                    .map(|(_, snapshot)| snapshot.write_count)
            })
            .unwrap_or(0)
    }

    /// Accepted records per second
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingestion.records_accepted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Relay Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Records accepted: {}", self.ingestion.records_accepted);
        println!("   ├─ Records persisted: {}", self.records_persisted());
        println!("   └─ Records/sec: {:.2}", self.records_per_sec());

        println!("\nUpstream");
        println!("   ├─ Frames received: {}", self.ingestion.frames_received);
        println!("   ├─ Rejected: {}", self.ingestion.records_rejected);
        println!("   ├─ Unsupported frames: {}", self.ingestion.unsupported_frames);
        println!("   ├─ Connect attempts: {}", self.ingestion.connect_attempts);
        println!("   └─ Reconnects: {}", self.ingestion.reconnects);

        match &self.dispatch {
            Some(report) => {
                println!("\nSinks");
                for (name, snapshot) in &report.sinks {
                    println!(
                        "   ├─ {}: written={} failed={} queued={}",
                        name, snapshot.write_count, snapshot.failure_count, snapshot.queue_len
                    );
                }
                println!("   └─ Drained: {}", report.drained);

                println!("\nLive");
                println!("   ├─ Published: {}", report.live.published);
                println!("   └─ Dropped (slow subscribers): {}", report.live.dropped);
            }
            None => println!("\nDispatcher did not report before the deadline"),
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher::{LiveSnapshot, MetricsSnapshot};

    #[test]
    fn test_records_persisted_reads_log_sink() {
        let stats = PipelineStats {
            duration: Duration::from_secs(2),
            ingestion: ingestion::MetricsSnapshot {
                records_accepted: 10,
                ..Default::default()
            },
            dispatch: Some(DispatchReport {
                records: 10,
                drained: true,
                sinks: vec![
                    (
                        "record_trace".to_string(),
                        MetricsSnapshot {
                            write_count: 3,
                            ..Default::default()
                        },
                    ),
                    (
                        RECORD_LOG_SINK.to_string(),
                        MetricsSnapshot {
                            write_count: 10,
                            ..Default::default()
                        },
                    ),
                ],
                live: LiveSnapshot::default(),
            }),
        };

        assert_eq!(stats.records_persisted(), 10);
        assert!((stats.records_per_sec() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stats() {
        let stats = PipelineStats::default();
        assert_eq!(stats.records_persisted(), 0);
        assert_eq!(stats.records_per_sec(), 0.0);
    }
}
