//! Configuration: typed structures, validation, presets, and YAML file
//! loading.
//!
//! A `.page-diff.yaml` file in the working directory (or an explicit
//! `--config` path) overrides the built-in defaults; CLI flags override
//! both.

mod types;
mod validation;

pub use types::{AppConfig, AppConfigBuilder, ConfigPreset};
pub use validation::{ConfigError, Validatable};

use crate::error::{PageDiffError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default config file name, discovered in the working directory.
pub const CONFIG_FILE_NAME: &str = ".page-diff.yaml";

/// Load a config file from an explicit path.
pub fn load_config_file(path: &Path) -> Result<AppConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| PageDiffError::io(path, e))?;
    let config: AppConfig = serde_yaml::from_str(&content)
        .map_err(|e| PageDiffError::config(format!("{}: {e}", path.display())))?;
    config
        .validate()
        .map_err(|e| PageDiffError::config(e.to_string()))?;
    Ok(config)
}

/// Look for the config file in the working directory.
#[must_use]
pub fn discover_config_file() -> Option<PathBuf> {
    let candidate = PathBuf::from(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Load the explicit path if given, else a discovered file, else defaults.
/// Returns the config and the path it was loaded from, if any.
pub fn load_or_default(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => discover_config_file(),
    };
    match path {
        Some(p) => {
            let config = load_config_file(&p)?;
            info!(path = %p.display(), "configuration loaded");
            Ok((config, Some(p)))
        }
        None => Ok((AppConfig::default(), None)),
    }
}

/// Generate a commented example configuration file.
#[must_use]
pub fn generate_example_config() -> String {
    let defaults = AppConfig::default();
    let yaml = serde_yaml::to_string(&defaults).unwrap_or_default();
    format!(
        "# page-diff configuration\n\
         # Place as {CONFIG_FILE_NAME} in your working directory.\n\
         # All keys are optional; omitted keys use the defaults below.\n\
         {yaml}"
    )
}
