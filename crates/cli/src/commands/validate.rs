//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::RelayConfig;

use super::load_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    upstream_url: String,
    log_path: String,
    reconnect_delay_ms: u64,
    subscriber_buffer: usize,
    bind_addr: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    if let Some(path) = &args.config.config {
        info!(config = %path.display(), "Validating configuration");
    }

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.config.as_ref().map(|p| p.display().to_string());

    match load_config(&args.config) {
        Ok(relay) => {
            let warnings = collect_warnings(&relay);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", relay.version),
                    upstream_url: relay.upstream.url.clone(),
                    log_path: relay.persistence.log_path.display().to_string(),
                    reconnect_delay_ms: relay.upstream.reconnect_delay_ms,
                    subscriber_buffer: relay.live.subscriber_buffer,
                    bind_addr: relay.server.bind_addr.clone(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(relay: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if relay.upstream.url.starts_with("wss://") && !cfg!(feature = "tls") {
        warnings.push("wss:// upstream but this build has no TLS support (feature `tls`)".to_string());
    }

    if relay.upstream.connect_timeout().is_none() {
        warnings.push("upstream.connect_timeout_ms is 0 - a stalled handshake blocks reconnects".to_string());
    }

    if relay.upstream.reconnect_delay_ms < 100 {
        warnings.push(format!(
            "upstream.reconnect_delay_ms is {} - reconnects will be very aggressive",
            relay.upstream.reconnect_delay_ms
        ));
    }

    if relay.persistence.drain_timeout_ms == 0 {
        warnings.push("persistence.drain_timeout_ms is 0 - queued records are abandoned at shutdown".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    let path = result.config_path.as_deref().unwrap_or("<overrides only>");

    if result.valid {
        println!("✓ Configuration is valid: {}", path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Upstream: {}", summary.upstream_url);
            println!("  Log: {}", summary.log_path);
            println!("  Reconnect delay: {}ms", summary.reconnect_delay_ms);
            println!("  Subscriber buffer: {}", summary.subscriber_buffer);
            println!("  Bind: {}", summary.bind_addr);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
