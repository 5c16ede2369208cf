mod schema;
mod validation;

pub use schema::{Config, EnrichmentConfig, FetchConfig};
pub use validation::validate_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/pr-pulse/)
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("pr-pulse"))
}

/// Get the default config file path (~/.config/pr-pulse/config.yaml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// With no explicit `path` the default location is used, and a missing file
/// there just means defaults. An explicit path must exist.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found at {}", path.display());
            }
            read_config(&path)
        }
        None => match get_config_path() {
            Some(path) if path.exists() => read_config(&path),
            _ => Ok(Config::default()),
        },
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_saphyr::from_str(&content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", path.display()))?;

    Ok(config)
}
