//! Errors from locating and preparing fdl's directories.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A storage location could not be resolved or prepared.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("cannot find a home directory; pass --downloads-dir or set FDL_DOWNLOADS_DIR")]
    NoHomeDir,

    #[error("cannot find the platform data directory; pass --data-dir or set FDL_DATA_DIR")]
    NoDataDir,

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// `create_dir_all` failed for a data, cache, or downloads directory.
    #[error("cannot create {path}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The write check inside an existing directory failed.
    #[error("{path} is not writable")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("an empty path was given for an fdl directory")]
    EmptyPath,
}

impl PathError {
    /// The directory the error is about, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::NotADirectory(path)
            | Self::CreateFailed { path, .. }
            | Self::NotWritable { path, .. } => Some(path),
            Self::NoHomeDir | Self::NoDataDir | Self::EmptyPath => None,
        }
    }
}
