//! `run` command implementation.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use contracts::RelayConfig;

use super::load_config;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.config.config {
        info!(config = %path.display(), "Loading configuration");
    }

    let relay = load_config(&args.config).context("Failed to load configuration")?;

    info!(
        upstream = %relay.upstream.url,
        log_path = %relay.persistence.log_path.display(),
        reconnect_delay_ms = relay.upstream.reconnect_delay_ms,
        bind_addr = %relay.server.bind_addr,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&relay);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        relay,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
        serve_http: !args.no_server,
        trace_records: args.trace_records,
    });

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        setup_shutdown_signal().await;
        warn!("Received shutdown signal, stopping relay...");
        signal_token.cancel();
    });

    info!("Starting relay...");
    let stats = pipeline
        .run(shutdown)
        .await
        .context("Relay execution failed")?;

    info!(
        duration_secs = stats.duration.as_secs_f64(),
        records_accepted = stats.ingestion.records_accepted,
        records_persisted = stats.records_persisted(),
        "Relay stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(relay: &RelayConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Upstream:");
    println!("  URL: {}", relay.upstream.url);
    println!("  Reconnect delay: {}ms", relay.upstream.reconnect_delay_ms);
    match relay.upstream.connect_timeout() {
        Some(timeout) => println!("  Connect timeout: {}ms", timeout.as_millis()),
        None => println!("  Connect timeout: none"),
    }
    println!("  Ingest queue: {}", relay.upstream.ingest_queue_capacity);
    println!("\nPersistence:");
    println!("  Log: {}", relay.persistence.log_path.display());
    println!("  Drain timeout: {}ms", relay.persistence.drain_timeout_ms);
    println!("\nLive:");
    println!("  Subscriber buffer: {}", relay.live.subscriber_buffer);
    println!("\nServer:");
    println!("  Bind: {}", relay.server.bind_addr);
    println!();
}
