//! Download error types.
//!
//! These errors are serializable and carry only strings, so they can be stored
//! in a task's `message` column or shipped to any front end unchanged. I/O
//! errors are captured as kind and message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::RepositoryError;

/// Error type for download operations.
///
/// Pause and cancel are not errors; they travel as stop reasons and outcomes.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadError {
    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "NotFound", "PermissionDenied").
        #[serde(rename = "io_kind")]
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// Network/HTTP error during probe or transfer.
    #[error("Network error: {message}")]
    Network {
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// A task with the same file name and MIME type already completed.
    #[error("Already downloaded: {file_name}")]
    AlreadyDownloaded {
        /// The file name that is already present.
        file_name: String,
    },

    /// Task (or other entity) not found.
    #[error("Not found: {message}")]
    NotFound {
        /// What was not found.
        message: String,
    },

    /// The requested operation is not valid in the task's current status.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the conflict.
        message: String,
    },

    /// The task store rejected a read or write.
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message.
        message: String,
    },

    /// Moving a finished file to public storage failed.
    #[error("Promotion failed: {message}")]
    Promotion {
        /// Detailed error message.
        message: String,
    },

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl DownloadError {
    /// Create an I/O error from kind and message strings.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a network error with HTTP status code.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an already-downloaded error.
    pub fn already_downloaded(file_name: impl Into<String>) -> Self {
        Self::AlreadyDownloaded {
            file_name: file_name.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a promotion error.
    pub fn promotion(message: impl Into<String>) -> Self {
        Self::Promotion {
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if a later resume can plausibly succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Io { .. } | Self::Promotion { .. } | Self::Storage { .. }
        )
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { message, .. } => format!("File operation failed: {message}"),
            Self::Network {
                message,
                status_code: Some(code),
            } => format!("Network error (HTTP {code}): {message}"),
            Self::Network { message, .. } => format!("Network error: {message}"),
            Self::AlreadyDownloaded { file_name } => {
                format!("'{file_name}' has already been downloaded.")
            }
            Self::NotFound { message } => format!("Not found: {message}"),
            Self::InvalidState { message } => message.clone(),
            Self::Storage { message } => format!("Could not save download state: {message}"),
            Self::Promotion { message } => {
                format!("Could not move the file to Downloads: {message}. Resume to retry.")
            }
            Self::Other { message } => message.clone(),
        }
    }
}

impl From<RepositoryError> for DownloadError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::not_found(what),
            other => Self::storage(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

/// Convenience result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;
