//! Configuration loading and discovery for `stitch.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::StitchConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "stitch.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Validation error
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override tile extension
    pub extension: Option<String>,
    /// Disable strip sorting
    pub no_sort: bool,
    /// Override uniform cell size
    pub cell_size: Option<(u32, u32)>,
    /// Override background color
    pub background: Option<String>,
    /// Force metadata output on
    pub metadata: bool,
    /// Override decode workers
    pub jobs: Option<usize>,
}

/// Find `stitch.toml` by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for `stitch.toml`
/// 2. Check `XDG_CONFIG_HOME/tilestitch/stitch.toml` (or `~/.config/tilestitch/stitch.toml`)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find `stitch.toml` in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("tilestitch").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find `stitch.toml` by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// [`find_config`] to locate one. With no config file at all the defaults
/// are returned.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&Path>) -> Result<StitchConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(StitchConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<StitchConfig, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config: StitchConfig = toml::from_str(&contents)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &StitchConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// Merge CLI overrides into a configuration, then re-validate it.
///
/// CLI arguments take precedence over config file values. Strategy flags are
/// not merged here; see [`StitchConfig::strategy_for`].
pub fn merge_cli_overrides(
    config: &mut StitchConfig,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(ref extension) = overrides.extension {
        config.input.extension = extension.clone();
    }

    if overrides.no_sort {
        config.layout.sort = false;
    }

    if let Some((w, h)) = overrides.cell_size {
        config.layout.cell_size = Some([w, h]);
    }

    if let Some(ref background) = overrides.background {
        config.output.background = background.clone();
    }

    if overrides.metadata {
        config.output.metadata = true;
    }

    if let Some(jobs) = overrides.jobs {
        config.decode.jobs = jobs;
    }

    validate(config)
}
