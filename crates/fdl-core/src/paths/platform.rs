//! Platform-specific directory roots.

use std::env;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "FDL_DATA_DIR";

/// Environment variable overriding the public downloads directory.
pub const DOWNLOADS_DIR_ENV: &str = "FDL_DOWNLOADS_DIR";

/// Get the root directory for application data (database, partial files).
///
/// Resolution order:
/// 1. `FDL_DATA_DIR` environment variable
/// 2. System data directory joined with `fdl`
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DATA_DIR_ENV) {
        return normalize_user_path(&path);
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    Ok(data_dir.join("fdl"))
}

/// Get the public directory completed downloads are promoted into.
///
/// Resolution order:
/// 1. `FDL_DOWNLOADS_DIR` environment variable
/// 2. The platform "Downloads" directory
/// 3. `$HOME/Downloads`
pub fn default_downloads_dir() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DOWNLOADS_DIR_ENV) {
        return normalize_user_path(&path);
    }

    if let Some(dir) = dirs::download_dir() {
        return Ok(dir);
    }

    let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
    Ok(home.join("Downloads"))
}

/// Normalize a user-provided path, expanding a leading `~`.
pub fn normalize_user_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }

    if trimmed == "~" || trimmed.starts_with("~/") {
        let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
        let rest = trimmed.trim_start_matches('~').trim_start_matches('/');
        return Ok(if rest.is_empty() { home } else { home.join(rest) });
    }

    Ok(PathBuf::from(trimmed))
}
