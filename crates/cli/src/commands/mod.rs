//! Command implementations.

mod query;
mod run;
mod validate;

pub use query::run_query;
pub use run::run_relay;
pub use validate::run_validate;

use config_loader::ConfigLoader;
use contracts::RelayConfig;

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};

/// Load the config file (if any), apply overrides and validate
pub(crate) fn load_config(args: &ConfigArgs) -> Result<RelayConfig> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()));
        }
    }

    Ok(ConfigLoader::load(args.config.as_deref(), &args.overrides())?)
}
