//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use rana_core::config::{default_config_path, CliConfigOverrides, LayeredConfig};
use std::path::{Path, PathBuf};

/// Load layered configuration: defaults, config file, environment, CLI
pub fn load_config(config_path: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = match config_path {
        // An explicitly named file has to exist
        Some(path) => LayeredConfig::with_defaults()
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?,
        None => LayeredConfig::with_defaults()
            .load_from_file_if_exists(default_config_path())
            .context("Failed to load configuration file")?,
    }
    .load_from_env();

    config.update_from_cli(overrides);
    Ok(config)
}

/// Where plugin settings (timestamps, last used folders) are kept
pub fn settings_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
        .with_file_name("settings.json")
}
