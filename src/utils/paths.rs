//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.
//! Everything lives under `~/.politisight/` unless `POLITISIGHT_HOME` is set.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Environment variable that relocates the application directory
pub const HOME_ENV_VAR: &str = "POLITISIGHT_HOME";

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Resolve the application directory from an optional override.
fn resolve_app_dir(override_dir: Option<OsString>) -> AppResult<PathBuf> {
    match override_dir.filter(|v| !v.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(home_dir()?.join(".politisight")),
    }
}

/// Get the PolitiSight directory (~/.politisight/ or `$POLITISIGHT_HOME`)
pub fn politisight_dir() -> AppResult<PathBuf> {
    resolve_app_dir(std::env::var_os(HOME_ENV_VAR))
}

/// Get the config file path (config.json in the app directory)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(politisight_dir()?.join("config.json"))
}

/// Get the data directory holding the key-value store
pub fn data_dir() -> AppResult<PathBuf> {
    Ok(politisight_dir()?.join("data"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the PolitiSight directory, creating it if it doesn't exist
pub fn ensure_politisight_dir() -> AppResult<PathBuf> {
    let path = politisight_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Get the data directory, creating it if it doesn't exist
pub fn ensure_data_dir() -> AppResult<PathBuf> {
    let path = data_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
