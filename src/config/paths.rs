//! Platform-specific configuration paths.

use crate::constants::APP_NAME;
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BIRDASH_CONFIG";

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/birdash/`
/// - macOS: `~/Library/Application Support/birdash/`
/// - Windows: `%APPDATA%\birdash\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the cache directory for the current platform.
pub fn cache_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .ok_or(Error::CacheDirNotFound)
}

/// Get the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Config file to use: the explicit path if given, else the platform default.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit.map_or_else(config_file_path, Ok)
}
