//! Public storage port.
//!
//! Finished partial files are promoted to a user-visible location keyed by
//! `(file_name, mime_type)`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::download::DownloadError;

/// Port for the user-visible downloads location.
#[async_trait]
pub trait PublicStoragePort: Send + Sync {
    /// Copy a finished partial file into public storage.
    ///
    /// The partial file is left in place; the caller deletes it once the
    /// completion has been recorded.
    async fn promote(
        &self,
        partial: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<PathBuf, DownloadError>;

    /// Remove a previously promoted file. Returns `false` if it was absent.
    async fn remove(&self, file_name: &str, mime_type: &str) -> Result<bool, DownloadError>;
}
