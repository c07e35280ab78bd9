//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use config_loader::ConfigOverrides;
use std::path::PathBuf;

/// Telemetry Relay - live telemetry ingestion, persistence and streaming
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-relay",
    author,
    version,
    about = "Live telemetry relay",
    long_about = "Connects to an upstream telemetry feed, validates every record, appends \n\
                  accepted records to a local log and streams them to live subscribers.\n\n\
                  The historical log can be queried over HTTP or with the `query` command."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay
    Run(RunArgs),

    /// Validate configuration without running
    Validate(ValidateArgs),

    /// Query the record log
    Query(QueryArgs),
}

/// Config file plus the values that may override it
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Upstream feed address (ws:// or wss://)
    #[arg(long, env = "RELAY_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Record log path
    #[arg(long, env = "RELAY_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Delay between reconnect attempts, in milliseconds
    #[arg(long, env = "RELAY_RECONNECT_DELAY_MS")]
    pub reconnect_delay_ms: Option<u64>,

    /// HTTP listen address
    #[arg(long, env = "RELAY_BIND_ADDR")]
    pub bind_addr: Option<String>,
}

impl ConfigArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            upstream_url: self.upstream_url.clone(),
            log_path: self.log_path.clone(),
            reconnect_delay_ms: self.reconnect_delay_ms,
            bind_addr: self.bind_addr.clone(),
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Do not start the HTTP / WebSocket server
    #[arg(long)]
    pub no_server: bool,

    /// Also log every accepted record
    #[arg(long)]
    pub trace_records: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `query` command
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Record log to scan (defaults to the configured log path)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Configuration file to take the log path from
    #[arg(short, long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Inclusive lower bound (epoch ms or RFC 3339)
    #[arg(long, allow_hyphen_values = true)]
    pub start: Option<String>,

    /// Inclusive upper bound (epoch ms or RFC 3339)
    #[arg(long, allow_hyphen_values = true)]
    pub end: Option<String>,

    /// Relative window ending now, e.g. 30s, 15m, 2h, 7d
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub last: Option<String>,

    /// Print a single JSON array instead of JSON lines
    #[arg(long)]
    pub array: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
