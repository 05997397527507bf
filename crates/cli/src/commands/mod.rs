//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use contracts::BridgeBlueprint;
use tracing::info;

use crate::error::{CliError, Result};

pub use info::run_info;
pub use run::run_bridge;
pub use validate::run_validate;

/// Load a blueprint from `path`, or fall back to the built-in defaults
pub(crate) fn load_blueprint(path: Option<&Path>) -> Result<BridgeBlueprint> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(BridgeBlueprint::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }

    config_loader::ConfigLoader::load_from_path(path).map_err(|e| CliError::config_load(path, e))
}
