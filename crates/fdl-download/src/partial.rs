//! Private partial-file storage.
//!
//! Each task owns at most one partial file, named after the task's file name
//! inside the cache directory. Its length is the authoritative resume offset.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fdl_core::{DownloadError, ensure_directory};

use crate::resolver::headers::{FALLBACK_FILE_NAME, sanitize_file_name};

/// Locates and removes partial files.
#[derive(Debug, Clone)]
pub struct PartialFileStore {
    dir: PathBuf,
}

impl PartialFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), DownloadError> {
        ensure_directory(&self.dir).map_err(|e| DownloadError::io("directory", e.to_string()))
    }

    /// Path of the partial file for `file_name`.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        let safe = sanitize_file_name(file_name).unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
        self.dir.join(safe)
    }

    /// Current partial length, 0 when the file does not exist.
    pub async fn len(&self, file_name: &str) -> Result<i64, DownloadError> {
        match tokio::fs::metadata(self.path_for(file_name)).await {
            Ok(meta) => Ok(i64::try_from(meta.len()).unwrap_or(i64::MAX)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(DownloadError::from_io_error(&e)),
        }
    }

    /// Delete the partial file. Returns `false` if there was none.
    pub async fn remove(&self, file_name: &str) -> Result<bool, DownloadError> {
        match tokio::fs::remove_file(self.path_for(file_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DownloadError::from_io_error(&e)),
        }
    }
}
