//! Resolve every location the application touches in one call.

use std::fmt;
use std::path::PathBuf;

use super::error::PathError;
use super::platform::{data_root, default_downloads_dir, normalize_user_path};

/// File name of the task database inside the data root.
pub const DATABASE_FILE: &str = "fdl.db";

/// Directory (inside the data root) holding partial files.
pub const PARTIAL_DIR: &str = "partial";

/// All resolved paths captured in a single struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Root directory for application data.
    pub data_root: PathBuf,
    /// Path to the `SQLite` database file.
    pub database_path: PathBuf,
    /// Private directory for partial files.
    pub cache_dir: PathBuf,
    /// Public directory for completed files.
    pub downloads_dir: PathBuf,
}

impl ResolvedPaths {
    /// Resolve using the environment, with optional explicit overrides.
    ///
    /// Nothing is created on disk; callers use
    /// [`ensure_directory`](super::ensure_directory) for that.
    pub fn resolve(
        data_dir: Option<&str>,
        downloads_dir: Option<&str>,
    ) -> Result<Self, PathError> {
        let data_root = match data_dir {
            Some(raw) => normalize_user_path(raw)?,
            None => data_root()?,
        };
        let downloads_dir = match downloads_dir {
            Some(raw) => normalize_user_path(raw)?,
            None => default_downloads_dir()?,
        };
        Ok(Self::under(data_root, downloads_dir))
    }

    /// Lay out the private paths under an explicit data root.
    #[must_use]
    pub fn under(data_root: PathBuf, downloads_dir: PathBuf) -> Self {
        Self {
            database_path: data_root.join(DATABASE_FILE),
            cache_dir: data_root.join(PARTIAL_DIR),
            data_root,
            downloads_dir,
        }
    }
}

impl fmt::Display for ResolvedPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "data root:  {}", self.data_root.display())?;
        writeln!(f, "database:   {}", self.database_path.display())?;
        writeln!(f, "partials:   {}", self.cache_dir.display())?;
        write!(f, "downloads:  {}", self.downloads_dir.display())
    }
}
