//! Initialize the configuration directory: create ~/.wxbot and a starter config.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config;

/// Ensure the configuration has been initialized (config file exists).
pub fn require_initialized(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `wxbot init` first (config file not found: {})",
            config_path.display()
        );
    }
    Ok(())
}

/// Create the config directory and a starter config file if they do not exist.
/// An existing config file is never overwritten.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let starter = serde_json::to_string_pretty(&config::Config::default())
            .context("serializing starter config")?;
        std::fs::write(config_path, starter)
            .with_context(|| format!("writing starter config to {}", config_path.display()))?;
        log::info!("created starter config at {}", config_path.display());
        log::info!("fill in completion.authToken and wecom.callbackToken (or use env vars) before starting the gateway");
    } else {
        log::debug!(
            "config already exists at {}, leaving it untouched",
            config_path.display()
        );
    }

    Ok(config_dir.to_path_buf())
}
