//! Filesystem-backed public storage.
//!
//! Promotion copies into a hidden sibling first and renames it into place,
//! so a half-copied file never appears under its final name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use fdl_core::{DownloadError, PublicStoragePort, ensure_directory};

use crate::resolver::headers::{FALLBACK_FILE_NAME, sanitize_file_name};

/// Public storage rooted at a downloads directory.
///
/// The media type does not influence placement here; all files share one
/// directory.
#[derive(Debug, Clone)]
pub struct DownloadsDirStorage {
    root: PathBuf,
}

impl DownloadsDirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Final location of `file_name`.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        let safe = sanitize_file_name(file_name).unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
        self.root.join(safe)
    }
}

#[async_trait]
impl PublicStoragePort for DownloadsDirStorage {
    async fn promote(
        &self,
        partial: &Path,
        file_name: &str,
        _mime_type: &str,
    ) -> Result<PathBuf, DownloadError> {
        ensure_directory(&self.root).map_err(|e| DownloadError::promotion(e.to_string()))?;

        let target = self.path_for(file_name);
        let staging = self.root.join(format!(
            ".{}.fdl-tmp",
            target
                .file_name()
                .map_or_else(|| FALLBACK_FILE_NAME.into(), |n| n.to_string_lossy())
        ));

        let copied = async {
            tokio::fs::copy(partial, &staging).await?;
            tokio::fs::rename(&staging, &target).await
        }
        .await;

        if let Err(e) = copied {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(DownloadError::promotion(format!(
                "failed to publish {}: {e}",
                target.display()
            )));
        }

        tracing::debug!(path = %target.display(), "file promoted");
        Ok(target)
    }

    async fn remove(&self, file_name: &str, _mime_type: &str) -> Result<bool, DownloadError> {
        match tokio::fs::remove_file(self.path_for(file_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DownloadError::from_io_error(&e)),
        }
    }
}
