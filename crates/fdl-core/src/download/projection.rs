//! Snapshot of task state published to subscribers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{DownloadTask, TaskId, TaskStatus};

/// Point-in-time view of all known tasks.
///
/// `active` holds Active, Paused and Queued tasks; `completed` holds
/// Completed ones. Cancelled tasks appear in neither.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSnapshot {
    pub active: BTreeMap<TaskId, DownloadTask>,
    pub completed: BTreeMap<TaskId, DownloadTask>,
    /// A metadata probe is in flight.
    pub is_loading: bool,
}

impl ProjectionSnapshot {
    /// File a task into the right collection, removing it from the other.
    pub fn upsert(&mut self, task: DownloadTask) {
        let id = task.id;
        match task.status {
            status if status.is_in_progress() => {
                self.completed.remove(&id);
                self.active.insert(id, task);
            }
            TaskStatus::Completed => {
                self.active.remove(&id);
                self.completed.insert(id, task);
            }
            _ => self.remove(id),
        }
    }

    /// Drop a task from both collections.
    pub fn remove(&mut self, id: TaskId) {
        self.active.remove(&id);
        self.completed.remove(&id);
    }

    /// Look a task up in either collection.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&DownloadTask> {
        self.active.get(&id).or_else(|| self.completed.get(&id))
    }

    /// Number of tasks currently in `Active` status.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.active
            .values()
            .filter(|t| t.status == TaskStatus::Active)
            .count()
    }

    /// Whether any task is running or waiting for a slot.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.active
            .values()
            .any(|t| matches!(t.status, TaskStatus::Active | TaskStatus::Queued))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::types::{DEFAULT_MIME_TYPE, RemoteFileMeta};

    fn task(id: i64, status: TaskStatus) -> DownloadTask {
        let mut task = DownloadTask::from_meta(&RemoteFileMeta {
            url: format!("https://example.com/{id}"),
            file_name: format!("{id}.bin"),
            total_bytes: 10,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            supports_resume: true,
        });
        task.id = TaskId::new(id);
        task.status = status;
        task
    }

    #[test]
    fn test_upsert_moves_between_collections() {
        let mut snap = ProjectionSnapshot::default();
        snap.upsert(task(1, TaskStatus::Active));
        assert_eq!(snap.active.len(), 1);
        assert_eq!(snap.running_count(), 1);

        snap.upsert(task(1, TaskStatus::Completed));
        assert!(snap.active.is_empty());
        assert_eq!(snap.completed.len(), 1);

        snap.upsert(task(1, TaskStatus::Cancelled));
        assert!(snap.get(TaskId::new(1)).is_none());
    }

    #[test]
    fn test_pending_work() {
        let mut snap = ProjectionSnapshot::default();
        snap.upsert(task(1, TaskStatus::Paused));
        assert!(!snap.has_pending_work());
        snap.upsert(task(2, TaskStatus::Queued));
        assert!(snap.has_pending_work());
    }
}
