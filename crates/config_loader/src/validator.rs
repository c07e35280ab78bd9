//! Config validation
//!
//! Rules:
//! - field-level rules declared on the contract types (required url, capacities > 0)
//! - persistence.log_path is required
//! - upstream.url uses the ws / wss scheme and names a host
//! - server.bind_addr is a socket address

use std::net::SocketAddr;

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{ContractError, RelayConfig};
use url::Url;

/// Validate a RelayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_field_rules(config)?;
    validate_log_path(config)?;
    validate_upstream_url(config)?;
    validate_bind_addr(config)?;
    Ok(())
}

/// Derive-based rules; reports the alphabetically first failing field
fn validate_field_rules(config: &RelayConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };

    let mut failures = Vec::new();
    collect_failures("", &errors, &mut failures);
    failures.sort();

    match failures.into_iter().next() {
        Some((field, message)) => Err(ContractError::config_validation(field, message)),
        None => Err(ContractError::config_validation("config", errors.to_string())),
    }
}

fn collect_failures(prefix: &str, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    out.push((path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_failures(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_failures(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

fn validate_log_path(config: &RelayConfig) -> Result<(), ContractError> {
    if config.persistence.log_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "persistence.log_path",
            "log file path is required",
        ));
    }
    Ok(())
}

fn validate_upstream_url(config: &RelayConfig) -> Result<(), ContractError> {
    let raw = config.upstream.url.trim();
    let url = Url::parse(raw).map_err(|e| {
        ContractError::config_validation("upstream.url", format!("'{raw}' is not a valid URL: {e}"))
    })?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ContractError::config_validation(
            "upstream.url",
            format!("'{raw}' must use the ws:// or wss:// scheme"),
        ));
    }

    if url.host_str().is_none_or(|host| host.trim().is_empty()) {
        return Err(ContractError::config_validation(
            "upstream.url",
            format!("'{raw}' has no host"),
        ));
    }
    Ok(())
}

fn validate_bind_addr(config: &RelayConfig) -> Result<(), ContractError> {
    config
        .server
        .bind_addr
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| {
            ContractError::config_validation(
                "server.bind_addr",
                format!("'{}' is not a socket address: {e}", config.server.bind_addr),
            )
        })
}
