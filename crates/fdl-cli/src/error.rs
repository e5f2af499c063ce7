//! CLI-specific error types and mappings.
//!
//! Maps download errors to exit codes and user-facing messages.

use fdl_core::{DownloadError, PathError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error reported by the download subsystem.
    #[error("{}", .0.user_message())]
    Download(DownloadError),

    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Configuration error (paths, environment).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Download(err) => match err {
                // EX_DATAERR
                DownloadError::AlreadyDownloaded { .. } | DownloadError::InvalidState { .. } => 65,
                DownloadError::NotFound { .. } => 66,  // EX_NOINPUT
                DownloadError::Network { .. } => 69,   // EX_UNAVAILABLE
                DownloadError::Io { .. } => 74,        // EX_IOERR
                DownloadError::Storage { .. } | DownloadError::Promotion { .. } => 73,
                DownloadError::Other { .. } => 1,
            },
            Self::Arguments(_) => 2,
            Self::Config(_) => 78, // EX_CONFIG
        }
    }

    /// Exit code for any error bubbled up to `main`.
    pub fn exit_code_for(err: &anyhow::Error) -> u8 {
        if let Some(cli) = err.downcast_ref::<Self>() {
            return cli.exit_code();
        }
        if let Some(download) = err.downcast_ref::<DownloadError>() {
            return Self::Download(download.clone()).exit_code();
        }
        if err.downcast_ref::<PathError>().is_some() {
            return Self::Config(String::new()).exit_code();
        }
        1
    }
}

impl From<DownloadError> for CliError {
    fn from(err: DownloadError) -> Self {
        Self::Download(err)
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        match std::error::Error::source(&err) {
            Some(source) => Self::Config(format!("{err}: {source}")),
            None => Self::Config(err.to_string()),
        }
    }
}
