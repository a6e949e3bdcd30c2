//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blockcheck_core::ProbeConfig;

/// `<config_dir>/blockcheck/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("blockcheck").join("config.toml"))
}

/// Parse a TOML config. Missing keys fall back to the built-in defaults.
pub fn parse_config(content: &str) -> Result<ProbeConfig> {
    toml::from_str(content).context("Invalid config file")
}

fn read_config(path: &Path) -> Result<ProbeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("In {}", path.display()))
}

/// Load the explicit config file, else the default location if it exists,
/// else the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ProbeConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => {
            tracing::debug!("Loading config from {}", path.display());
            read_config(&path)
        }
        _ => Ok(ProbeConfig::default()),
    }
}

/// The built-in defaults, as a config file.
pub fn default_config_toml() -> Result<String> {
    let body = toml::to_string_pretty(&ProbeConfig::default())
        .context("Failed to serialize default config")?;
    Ok(format!(
        "# blockcheck configuration\n# timeout is in seconds, per probe\n\n{body}"
    ))
}
