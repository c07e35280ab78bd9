//! # Integration Tests
//!
//! End-to-end tests across crates, with a scripted upstream in place of a
//! real feed.
//!
//! Covers:
//! - config -> connector -> dispatcher wiring
//! - ordering and exactly-once persistence across reconnects
//! - live fan-out next to persistence
//! - historical queries over the log the relay wrote

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use contracts::Record;
    use dispatcher::{DispatchReport, DispatcherBuilder, DispatcherConfig, LivePublisher};
    use history::{LogReader, RangeQuery};
    use ingestion::{
        ConnectorConfig, IngestionMetrics, ScriptHandle, ScriptedSource, Session, SessionClose,
        UpstreamConnector,
    };
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    /// Running relay core: scripted upstream -> connector -> dispatcher
    struct Relay {
        live: LivePublisher,
        metrics: Arc<IngestionMetrics>,
        shutdown: CancellationToken,
        connector: JoinHandle<ingestion::Result<()>>,
        dispatcher: JoinHandle<DispatchReport>,
    }

    impl Relay {
        async fn start(source: ScriptedSource, log_path: &Path) -> Self {
            let config = DispatcherConfig {
                log_path: log_path.to_path_buf(),
                subscriber_buffer: 1024,
                drain_timeout: Duration::from_secs(5),
                trace_records: false,
            };
            Self::start_with(source, config, ConnectorConfig::new(Duration::from_millis(10))).await
        }

        async fn start_with(
            source: ScriptedSource,
            dispatcher_config: DispatcherConfig,
            connector_config: ConnectorConfig,
        ) -> Self {
            let (record_tx, record_rx) = mpsc::channel(64);
            let dispatcher = DispatcherBuilder::new(dispatcher_config, record_rx)
                .build()
                .await
                .unwrap();
            let live = dispatcher.live();

            let shutdown = CancellationToken::new();
            let connector = UpstreamConnector::new(source, connector_config, record_tx);
            let metrics = connector.metrics();

            Self {
                live,
                metrics,
                dispatcher: dispatcher.spawn(),
                connector: connector.spawn(shutdown.clone()),
                shutdown,
            }
        }

        async fn stop(self) -> DispatchReport {
            self.shutdown.cancel();
            self.connector.await.unwrap().unwrap();
            self.dispatcher.await.unwrap()
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    /// Block until the script is used up
    async fn wait_for_connects(handle: &ScriptHandle, connects: usize) {
        let handle = handle.clone();
        wait_for(move || handle.connects() >= connects).await;
    }

    fn frame(ts: i64, value: i64) -> String {
        format!("{{\"timestamp\":{ts},\"value\":{value}}}")
    }

    fn persisted(log_path: &Path) -> Vec<(i64, i64)> {
        LogReader::new(log_path)
            .query(RangeQuery::unbounded())
            .unwrap()
            .map(|r| (r.timestamp(), r.value()))
            .collect()
    }

    fn log_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("data/telemetry.log")
    }

    #[tokio::test]
    async fn test_reconnect_after_error_persists_each_record_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_path(&dir);

        let first: Vec<String> = (1..=3).map(|ts| frame(ts, ts * 10)).collect();
        let second: Vec<String> = (4..=5).map(|ts| frame(ts, ts * 10)).collect();
        let first: Vec<&str> = first.iter().map(String::as_str).collect();
        let second: Vec<&str> = second.iter().map(String::as_str).collect();

        let source = ScriptedSource::new("ws://scripted/feed")
            .session(Session::text(&first, SessionClose::Error))
            .refuse()
            .session(Session::text(&second, SessionClose::Normal));
        let handle = source.handle();

        let relay = Relay::start(source, &log).await;
        wait_for_connects(&handle, 4).await;
        let report = relay.stop().await;

        assert_eq!(report.records, 5);
        assert!(report.drained);
        assert_eq!(
            persisted(&log),
            vec![(1, 10), (2, 20), (3, 30), (4, 40), (5, 50)]
        );
    }

    #[tokio::test]
    async fn test_rejected_frames_never_reach_log_or_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_path(&dir);

        let ok_1 = frame(1_000, 1);
        let ok_2 = frame(2_000, 2);
        let source = ScriptedSource::new("ws://scripted/feed")
            .session(Session::text(
                &[
                    ok_1.as_str(),
                    r#"{"timestamp":0,"value":5}"#,
                    r#"{"timestamp":1500,"value":-1}"#,
                    "{truncated",
                    "   ",
                    r#"{"timestamp":1700}"#,
                    ok_2.as_str(),
                ],
                SessionClose::Normal,
            ));
        let handle = source.handle();

        let relay = Relay::start(source, &log).await;
        let mut subscription = relay.live.subscribe();
        wait_for_connects(&handle, 2).await;

        let snapshot = relay.metrics.snapshot();
        assert_eq!(snapshot.frames_received, 7);
        assert_eq!(snapshot.records_accepted, 2);
        assert_eq!(snapshot.records_rejected, 5);

        relay.stop().await;

        assert_eq!(persisted(&log), vec![(1_000, 1), (2_000, 2)]);

        let mut live_seen = Vec::new();
        while let Some(record) = subscription.recv().await {
            live_seen.push((record.timestamp(), record.value()));
        }
        assert_eq!(live_seen, vec![(1_000, 1), (2_000, 2)]);
    }

    #[tokio::test]
    async fn test_accepted_record_round_trips_through_query() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_path(&dir);

        let source = ScriptedSource::new("ws://scripted/feed").session(Session::text(
            &[
                r#"{"timestamp": 1700000000000, "value": 72}"#,
                r#"{"timestamp": 1700000000000, "value": -5}"#,
                "not json",
            ],
            SessionClose::Normal,
        ));
        let handle = source.handle();

        let relay = Relay::start(source, &log).await;
        wait_for_connects(&handle, 2).await;
        relay.stop().await;

        let content = std::fs::read_to_string(&log).unwrap();
        assert_eq!(content, "{\"timestamp\":1700000000000,\"value\":72}\n");

        let found: Vec<Record> = LogReader::new(&log)
            .query_between(1_699_999_999_000, 1_700_000_001_000)
            .unwrap()
            .collect();
        assert_eq!(found, vec![Record::new(1_700_000_000_000, 72).unwrap()]);
    }

    #[tokio::test]
    async fn test_live_and_persisted_sequences_match() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_path(&dir);

        let frames: Vec<String> = (1..=200).map(|ts| frame(ts, ts % 13)).collect();
        let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
        let source = ScriptedSource::new("ws://scripted/feed")
            .session(Session::text(&frames, SessionClose::Normal));
        let handle = source.handle();

        let relay = Relay::start(source, &log).await;
        let mut first = relay.live.subscribe();
        let mut second = relay.live.subscribe();
        wait_for_connects(&handle, 2).await;
        relay.stop().await;

        let expected: Vec<(i64, i64)> = (1..=200).map(|ts| (ts, ts % 13)).collect();
        assert_eq!(persisted(&log), expected);

        for subscription in [&mut first, &mut second] {
            let mut seen = Vec::new();
            while let Some(record) = subscription.recv().await {
                seen.push((record.timestamp(), record.value()));
            }
            assert_eq!(seen, expected);
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_accepted_records() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_path(&dir);

        let frames: Vec<String> = (1..=50).map(|ts| frame(ts, ts)).collect();
        let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
        let source = ScriptedSource::new("ws://scripted/feed")
            .session(Session::text(&frames, SessionClose::Hang));

        let relay = Relay::start(source, &log).await;
        let metrics = relay.metrics.clone();
        wait_for(move || metrics.snapshot().records_accepted == 50).await;

        let report = tokio::time::timeout(Duration::from_secs(10), relay.stop())
            .await
            .unwrap();
        assert_eq!(report.records, 50);
        assert!(report.drained);
        assert_eq!(persisted(&log).len(), 50);
    }

    #[tokio::test]
    async fn test_query_ranges_over_relay_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_path(&dir);

        let frames: Vec<String> = [100, 200, 300, 400, 500]
            .iter()
            .map(|ts| frame(*ts, ts / 100))
            .collect();
        let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
        let source = ScriptedSource::new("ws://scripted/feed")
            .session(Session::text(&frames, SessionClose::Normal));
        let handle = source.handle();

        let relay = Relay::start(source, &log).await;
        wait_for_connects(&handle, 2).await;
        relay.stop().await;

        let reader = LogReader::new(&log);
        let between = |start, end| -> Vec<i64> {
            reader
                .query_between(start, end)
                .unwrap()
                .map(|r: Record| r.timestamp())
                .collect()
        };

        assert_eq!(between(200, 400), vec![200, 300, 400]);
        assert_eq!(between(250, 250), Vec::<i64>::new());
        assert_eq!(between(500, 100), Vec::<i64>::new());
        assert_eq!(between(0, 100), vec![100]);

        let mut scan = reader
            .query(RangeQuery::from_params(Some("300"), None, None, Utc::now()).unwrap())
            .unwrap();
        let tail: Vec<i64> = scan.by_ref().map(|r| r.timestamp()).collect();
        assert_eq!(tail, vec![300, 400, 500]);
        assert_eq!(scan.stats().skipped, 0);
    }

    #[tokio::test]
    async fn test_config_file_drives_wiring() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_path(&dir);
        let config_path = dir.path().join("relay.toml");
        std::fs::write(
            &config_path,
            format!(
                "[upstream]\nurl = \"ws://scripted/feed\"\nreconnect_delay_ms = 20\n\n\
                 [persistence]\nlog_path = {:?}\n\n[live]\nsubscriber_buffer = 4\n",
                log.display().to_string()
            ),
        )
        .unwrap();

        let relay_config = config_loader::ConfigLoader::load_from_path(&config_path).unwrap();
        assert_eq!(relay_config.persistence.log_path, log);

        let frames: Vec<String> = (1..=3).map(|ts| frame(ts, 0)).collect();
        let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
        let source = ScriptedSource::new(relay_config.upstream.url.clone())
            .session(Session::text(&frames, SessionClose::Normal));
        let handle = source.handle();

        let relay = Relay::start_with(
            source,
            DispatcherConfig::from_relay(&relay_config),
            ConnectorConfig::from(&relay_config.upstream),
        )
        .await;
        assert_eq!(relay.live.capacity(), 4);

        wait_for_connects(&handle, 2).await;
        relay.stop().await;

        assert_eq!(persisted(&log), vec![(1, 0), (2, 0), (3, 0)]);
    }
}
