//! Task store port.
//!
//! The store is the source of truth for progress across restarts. Every
//! mutation is published on a broadcast channel so readers can keep a pushed
//! view of "all tasks with status X" without polling.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::RepositoryError;
use crate::download::{DownloadTask, TaskId, TaskProgress, TaskStatus};

/// What happened to a task row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskChangeKind {
    /// Inserted or updated.
    Upserted,
    /// Deleted.
    Deleted,
}

/// Change notification published after a successful mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskChange {
    pub id: TaskId,
    pub kind: TaskChangeKind,
}

impl TaskChange {
    #[must_use]
    pub const fn upserted(id: TaskId) -> Self {
        Self {
            id,
            kind: TaskChangeKind::Upserted,
        }
    }

    #[must_use]
    pub const fn deleted(id: TaskId) -> Self {
        Self {
            id,
            kind: TaskChangeKind::Deleted,
        }
    }
}

/// Port for persisting download tasks.
#[async_trait]
pub trait TaskRepositoryPort: Send + Sync {
    /// Upsert keyed by id; an unset id inserts a new row.
    ///
    /// Returns the assigned (or existing) id. A second row with the same
    /// `(file_name, mime_type)` is rejected with [`RepositoryError::Constraint`].
    async fn insert_or_update(&self, task: &DownloadTask) -> Result<TaskId, RepositoryError>;

    /// Point lookup by id.
    async fn get(&self, id: TaskId) -> Result<Option<DownloadTask>, RepositoryError>;

    /// Point lookup by the dedup key.
    async fn find_by_file(
        &self,
        file_name: &str,
        mime_type: &str,
    ) -> Result<Option<DownloadTask>, RepositoryError>;

    /// Every task, newest first.
    async fn list_all(&self) -> Result<Vec<DownloadTask>, RepositoryError>;

    /// Every task whose status is one of `statuses`, newest first.
    async fn list_by_status(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<DownloadTask>, RepositoryError>;

    /// The task that has waited longest in `Queued`.
    async fn next_queued(&self) -> Result<Option<DownloadTask>, RepositoryError>;

    /// Apply a progress/status update in one atomic write.
    ///
    /// Returns `false` when no row has that id.
    async fn update_progress(&self, update: &TaskProgress) -> Result<bool, RepositoryError>;

    /// Remove a row. Returns `false` when no row has that id.
    async fn delete(&self, id: TaskId) -> Result<bool, RepositoryError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<TaskChange>;
}
