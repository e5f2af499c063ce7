//! In-memory task projection.
//!
//! A single `watch` channel carries the whole [`ProjectionSnapshot`]. Running
//! jobs update it on every chunk; the store listener folds durable changes in
//! so that writes made outside a job (resolve, reconcile, delete) show up too.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use fdl_core::{
    DownloadError, DownloadTask, ProjectionSnapshot, TaskChangeKind, TaskId, TaskRepositoryPort,
    TaskStatus, progress_percent,
};

/// Shared handle to the published snapshot.
#[derive(Clone)]
pub struct TaskProjection {
    tx: Arc<watch::Sender<ProjectionSnapshot>>,
}

impl Default for TaskProjection {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskProjection {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProjectionSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProjectionSnapshot> {
        self.tx.subscribe()
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> ProjectionSnapshot {
        self.tx.borrow().clone()
    }

    /// Replace the task collections with the store's contents.
    pub async fn load(&self, repo: &dyn TaskRepositoryPort) -> Result<(), DownloadError> {
        let tasks = repo.list_all().await?;
        self.tx.send_modify(|snapshot| {
            snapshot.active.clear();
            snapshot.completed.clear();
            for task in tasks {
                snapshot.upsert(task);
            }
        });
        Ok(())
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_if_modified(|snapshot| {
            let changed = snapshot.is_loading != loading;
            snapshot.is_loading = loading;
            changed
        });
    }

    pub fn upsert(&self, task: DownloadTask) {
        self.tx.send_modify(|snapshot| snapshot.upsert(task));
    }

    pub fn remove(&self, id: TaskId) {
        self.tx.send_modify(|snapshot| snapshot.remove(id));
    }

    /// Per-chunk progress for a running task. Unknown ids are ignored.
    pub fn record_progress(&self, id: TaskId, downloaded: i64, total: i64, speed: &str) {
        self.tx.send_if_modified(|snapshot| {
            let Some(task) = snapshot.active.get_mut(&id) else {
                return false;
            };
            task.status = TaskStatus::Active;
            task.downloaded_bytes = downloaded;
            task.total_bytes = total;
            task.progress = progress_percent(downloaded, total);
            speed.clone_into(&mut task.speed);
            true
        });
    }

    /// Fold a row read back from the store into the snapshot.
    ///
    /// Durable progress lags the live counters, so while a task stays
    /// `Active` the in-memory byte counts win. Every `Active` write in this
    /// process reaches the snapshot directly, so a stored `Active` row for a
    /// task that is missing or already settled here was read before that
    /// settlement and is dropped.
    fn apply_stored(&self, mut task: DownloadTask) {
        self.tx.send_if_modified(|snapshot| {
            if task.status == TaskStatus::Active {
                match snapshot.active.get(&task.id) {
                    Some(live) if live.status == TaskStatus::Active => {
                        task.downloaded_bytes = live.downloaded_bytes;
                        task.total_bytes = live.total_bytes;
                        task.progress = live.progress;
                        task.speed.clone_from(&live.speed);
                    }
                    Some(live) if live.status == TaskStatus::Queued => {}
                    _ => {
                        tracing::debug!(task_id = %task.id, "dropping stale active row");
                        return false;
                    }
                }
            }
            snapshot.upsert(task);
            true
        });
    }

    /// Follow the store's change feed until it closes.
    pub fn spawn_store_listener(&self, repo: Arc<dyn TaskRepositoryPort>) -> JoinHandle<()> {
        let projection = self.clone();
        let mut changes = repo.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => match change.kind {
                        TaskChangeKind::Upserted => match repo.get(change.id).await {
                            Ok(Some(task)) => projection.apply_stored(task),
                            Ok(None) => projection.remove(change.id),
                            Err(e) => {
                                tracing::warn!(task_id = %change.id, error = %e, "failed to read changed task");
                            }
                        },
                        TaskChangeKind::Deleted => projection.remove(change.id),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "task change feed lagged, reloading");
                        if let Err(e) = projection.load(repo.as_ref()).await {
                            tracing::warn!(error = %e, "projection reload failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("task change feed closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdl_core::{DEFAULT_MIME_TYPE, RemoteFileMeta, TaskProgress};
    use fdl_db::TestDb;
    use std::time::Duration;

    fn meta(name: &str) -> RemoteFileMeta {
        RemoteFileMeta {
            url: format!("https://example.com/{name}"),
            file_name: name.to_string(),
            total_bytes: 100,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            supports_resume: true,
        }
    }

    #[tokio::test]
    async fn test_load_files_tasks_by_status() {
        let db = TestDb::new().await.unwrap();
        let repo = db.task_repository();
        let a = repo.insert_or_update(&DownloadTask::from_meta(&meta("a"))).await.unwrap();
        let b = repo.insert_or_update(&DownloadTask::from_meta(&meta("b"))).await.unwrap();
        repo.update_progress(&TaskProgress::new(b, TaskStatus::Completed, 100, 100))
            .await
            .unwrap();

        let projection = TaskProjection::new();
        projection.load(repo.as_ref()).await.unwrap();

        let snapshot = projection.snapshot();
        assert!(snapshot.active.contains_key(&a));
        assert!(snapshot.completed.contains_key(&b));
    }

    #[test]
    fn test_record_progress_updates_active_only() {
        let projection = TaskProjection::new();
        let mut task = DownloadTask::from_meta(&meta("a"));
        task.id = TaskId::new(1);
        projection.upsert(task);

        projection.record_progress(TaskId::new(1), 50, 100, "1.0 KB/s");
        projection.record_progress(TaskId::new(2), 50, 100, "1.0 KB/s");

        let snapshot = projection.snapshot();
        let task = snapshot.get(TaskId::new(1)).unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.downloaded_bytes, 50);
        assert!((task.progress - 50.0).abs() < f64::EPSILON);
        assert_eq!(task.speed, "1.0 KB/s");
        assert!(snapshot.get(TaskId::new(2)).is_none());
    }

    #[test]
    fn test_loading_flag_notifies_subscribers() {
        let projection = TaskProjection::new();
        let mut rx = projection.subscribe();
        projection.set_loading(true);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_loading);

        projection.set_loading(true);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_stored_active_row_keeps_live_counters() {
        let projection = TaskProjection::new();
        let mut task = DownloadTask::from_meta(&meta("a"));
        task.id = TaskId::new(1);
        task.status = TaskStatus::Active;
        projection.upsert(task.clone());
        projection.record_progress(task.id, 80, 100, "2.0 KB/s");

        task.downloaded_bytes = 10;
        projection.apply_stored(task.clone());
        assert_eq!(projection.snapshot().get(task.id).unwrap().downloaded_bytes, 80);

        task.status = TaskStatus::Paused;
        task.downloaded_bytes = 80;
        projection.apply_stored(task.clone());
        assert_eq!(
            projection.snapshot().get(task.id).unwrap().status,
            TaskStatus::Paused
        );
    }

    #[test]
    fn test_stale_active_row_does_not_undo_settlement() {
        let projection = TaskProjection::new();
        let mut task = DownloadTask::from_meta(&meta("a"));
        task.id = TaskId::new(1);
        task.status = TaskStatus::Completed;
        task.downloaded_bytes = 100;
        projection.upsert(task.clone());

        let mut stale = task.clone();
        stale.status = TaskStatus::Active;
        stale.downloaded_bytes = 40;
        projection.apply_stored(stale.clone());
        let snapshot = projection.snapshot();
        assert_eq!(snapshot.get(task.id).unwrap().status, TaskStatus::Completed);
        assert!(!snapshot.active.contains_key(&task.id));

        task.status = TaskStatus::Paused;
        projection.upsert(task.clone());
        projection.apply_stored(stale.clone());
        assert_eq!(projection.snapshot().get(task.id).unwrap().status, TaskStatus::Paused);

        projection.remove(task.id);
        projection.apply_stored(stale);
        assert!(projection.snapshot().get(task.id).is_none());
    }

    #[tokio::test]
    async fn test_listener_follows_store_writes() {
        let db = TestDb::new().await.unwrap();
        let repo = db.task_repository();
        let projection = TaskProjection::new();
        let listener = projection.spawn_store_listener(repo.clone());
        let mut rx = projection.subscribe();

        let id = repo.insert_or_update(&DownloadTask::from_meta(&meta("a"))).await.unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|snapshot| snapshot.active.contains_key(&id)),
        )
        .await
        .unwrap()
        .unwrap();

        repo.delete(id).await.unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|snapshot| snapshot.get(id).is_none()),
        )
        .await
        .unwrap()
        .unwrap();

        listener.abort();
    }
}
