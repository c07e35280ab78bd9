//! `query` command implementation.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use config_loader::ConfigLoader;
use contracts::Record;
use history::{LogReader, RangeQuery};

use crate::cli::QueryArgs;
use crate::error::CliError;

/// Execute the `query` command
///
/// Prints matching records to stdout, one JSON object per line.
pub fn run_query(args: &QueryArgs) -> Result<()> {
    let log_path = resolve_log_path(args)?;
    let range = RangeQuery::from_params(
        args.start.as_deref(),
        args.end.as_deref(),
        args.last.as_deref(),
        Utc::now(),
    )
    .map_err(CliError::from)?;

    info!(
        log = %log_path.display(),
        start = range.start,
        end = range.end,
        "Querying record log"
    );

    let mut scan = LogReader::new(&log_path)
        .query(range)
        .map_err(CliError::from)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.array {
        let records: Vec<Record> = scan.by_ref().collect();
        serde_json::to_writer(&mut out, &records).context("Failed to write records")?;
        writeln!(out)?;
    } else {
        for record in scan.by_ref() {
            serde_json::to_writer(&mut out, &record).context("Failed to write record")?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    let stats = scan.stats();
    info!(
        scanned = stats.scanned,
        matched = stats.matched,
        skipped = stats.skipped,
        "Query complete"
    );
    Ok(())
}

fn resolve_log_path(args: &QueryArgs) -> Result<PathBuf> {
    if let Some(log) = &args.log {
        return Ok(log.clone());
    }

    let Some(config_path) = &args.config else {
        return Err(CliError::LogPathMissing.into());
    };
    if !config_path.exists() {
        return Err(CliError::config_not_found(config_path.display().to_string()).into());
    }

    let relay = ConfigLoader::read_from_path(config_path).map_err(CliError::from)?;
    if relay.persistence.log_path.as_os_str().is_empty() {
        return Err(CliError::LogPathMissing.into());
    }
    Ok(relay.persistence.log_path)
}
