//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` or `reqwest` types in any signature
//! - Repository traits are CRUD-focused
//! - Side-effect sinks (events, notifications) are fire-and-forget

pub mod download_event_emitter;
pub mod download_manager;
pub mod notification;
pub mod public_storage;
pub mod task_repository;

use thiserror::Error;

pub use download_event_emitter::{
    ChannelDownloadEmitter, DownloadEventEmitterPort, NoopDownloadEmitter,
};
pub use download_manager::{DownloadManagerConfig, DownloadManagerPort};
pub use notification::{NoopNotifier, NotificationPort};
pub use public_storage::PublicStoragePort;
pub use task_repository::{TaskChange, TaskChangeKind, TaskRepositoryPort};

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx
/// errors) and provides a clean interface for services to handle storage
/// failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A constraint was violated (e.g., unique `(file_name, mime_type)`).
    #[error("Constraint violation: {0}")]
    Constraint(String),
}
