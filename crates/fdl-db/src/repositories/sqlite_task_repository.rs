//! `SQLite` implementation of the `TaskRepositoryPort` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use fdl_core::{
    DownloadTask, RepositoryError, TaskChange, TaskId, TaskProgress, TaskRepositoryPort,
    TaskStatus,
};

const TASK_COLUMNS: &str = "id, file_name, url, mime_type, total_bytes, downloaded_bytes, \
     progress, speed, status, message, supports_resume, is_loading, created_at, updated_at";

/// Buffered change notifications per subscriber before it lags.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// `SQLite` implementation of the `TaskRepositoryPort` trait.
///
/// Every successful mutation is announced on a broadcast channel so the
/// projection can follow the store without polling.
pub struct SqliteTaskRepository {
    pool: SqlitePool,
    changes: broadcast::Sender<TaskChange>,
}

impl SqliteTaskRepository {
    /// Create a new `SQLite` task repository.
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// Get a reference to the underlying pool (for testing only).
    #[cfg(test)]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn publish(&self, change: TaskChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        binds: &[&str],
    ) -> Result<Option<DownloadTask>, RepositoryError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM download_tasks WHERE {clause} LIMIT 1");
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.as_ref().map(row_to_task).transpose()
    }
}

#[async_trait]
impl TaskRepositoryPort for SqliteTaskRepository {
    async fn insert_or_update(&self, task: &DownloadTask) -> Result<TaskId, RepositoryError> {
        let now = Utc::now();
        let queued_at = (task.status == TaskStatus::Queued).then_some(now);
        let id = (!task.id.is_unset()).then(|| task.id.get());

        let result = sqlx::query(
            r"
            INSERT INTO download_tasks (
                id, file_name, url, mime_type, total_bytes, downloaded_bytes,
                progress, speed, status, message, supports_resume, is_loading,
                queued_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                file_name = excluded.file_name,
                url = excluded.url,
                mime_type = excluded.mime_type,
                total_bytes = excluded.total_bytes,
                downloaded_bytes = excluded.downloaded_bytes,
                progress = excluded.progress,
                speed = excluded.speed,
                status = excluded.status,
                message = excluded.message,
                supports_resume = excluded.supports_resume,
                is_loading = excluded.is_loading,
                queued_at = CASE
                    WHEN excluded.status = 'queued' THEN COALESCE(download_tasks.queued_at, excluded.queued_at)
                    ELSE NULL
                END,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id)
        .bind(&task.file_name)
        .bind(&task.url)
        .bind(&task.mime_type)
        .bind(task.total_bytes)
        .bind(task.downloaded_bytes)
        .bind(task.progress)
        .bind(&task.speed)
        .bind(task.status.as_str())
        .bind(&task.message)
        .bind(task.supports_resume)
        .bind(task.is_loading)
        .bind(queued_at)
        .bind(task.created_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let assigned = TaskId::new(id.unwrap_or_else(|| result.last_insert_rowid()));
        self.publish(TaskChange::upserted(assigned));
        Ok(assigned)
    }

    async fn get(&self, id: TaskId) -> Result<Option<DownloadTask>, RepositoryError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM download_tasks WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn find_by_file(
        &self,
        file_name: &str,
        mime_type: &str,
    ) -> Result<Option<DownloadTask>, RepositoryError> {
        self.fetch_one_where("file_name = ? AND mime_type = ?", &[file_name, mime_type])
            .await
    }

    async fn list_all(&self) -> Result<Vec<DownloadTask>, RepositoryError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM download_tasks ORDER BY id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        rows.iter().map(row_to_task).collect()
    }

    async fn list_by_status(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<DownloadTask>, RepositoryError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM download_tasks WHERE status IN ({placeholders}) ORDER BY id DESC"
        );
        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        rows.iter().map(row_to_task).collect()
    }

    async fn next_queued(&self) -> Result<Option<DownloadTask>, RepositoryError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM download_tasks WHERE status = 'queued' \
             ORDER BY queued_at ASC, id ASC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn update_progress(&self, update: &TaskProgress) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let status = update.status.as_str();

        let result = sqlx::query(
            r"
            UPDATE download_tasks SET
                status = ?,
                downloaded_bytes = ?,
                total_bytes = ?,
                progress = ?,
                speed = ?,
                message = COALESCE(?, message),
                queued_at = CASE WHEN ? = 'queued' THEN COALESCE(queued_at, ?) ELSE NULL END,
                updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(status)
        .bind(update.downloaded_bytes)
        .bind(update.total_bytes)
        .bind(update.progress)
        .bind(&update.speed)
        .bind(update.message.as_deref())
        .bind(status)
        .bind(now)
        .bind(now)
        .bind(update.id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let affected = result.rows_affected() > 0;
        if affected {
            self.publish(TaskChange::upserted(update.id));
        }
        Ok(affected)
    }

    async fn delete(&self, id: TaskId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM download_tasks WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let affected = result.rows_affected() > 0;
        if affected {
            self.publish(TaskChange::deleted(id));
        }
        Ok(affected)
    }

    fn subscribe(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }
}

/// Convert a database row to a `DownloadTask`.
fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<DownloadTask, RepositoryError> {
    use sqlx::Row;

    let id: i64 = row.try_get("id").map_err(map_column_error)?;
    let status: String = row.try_get("status").map_err(map_column_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map_column_error)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(map_column_error)?;

    Ok(DownloadTask {
        id: TaskId::new(id),
        file_name: row.try_get("file_name").map_err(map_column_error)?,
        url: row.try_get("url").map_err(map_column_error)?,
        mime_type: row.try_get("mime_type").map_err(map_column_error)?,
        total_bytes: row.try_get("total_bytes").map_err(map_column_error)?,
        downloaded_bytes: row.try_get("downloaded_bytes").map_err(map_column_error)?,
        progress: row.try_get("progress").map_err(map_column_error)?,
        speed: row.try_get("speed").map_err(map_column_error)?,
        status: TaskStatus::parse(&status),
        message: row.try_get("message").map_err(map_column_error)?,
        supports_resume: row.try_get("supports_resume").map_err(map_column_error)?,
        is_loading: row.try_get("is_loading").map_err(map_column_error)?,
        created_at,
        updated_at,
    })
}

fn map_column_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Serialization(format!("Column read error: {e}"))
}

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Constraint(db.message().to_string())
        }
        _ => RepositoryError::Storage(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use fdl_core::{DEFAULT_MIME_TYPE, RemoteFileMeta, TaskChangeKind};
    use tokio_test::assert_ok;

    async fn repo() -> SqliteTaskRepository {
        SqliteTaskRepository::new(setup_test_database().await.unwrap())
    }

    fn new_task(name: &str) -> DownloadTask {
        DownloadTask::from_meta(&RemoteFileMeta {
            url: format!("https://example.com/{name}"),
            file_name: name.to_string(),
            total_bytes: 1000,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            supports_resume: true,
        })
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_reads_back() {
        let repo = repo().await;
        let id = assert_ok!(repo.insert_or_update(&new_task("a.bin")).await);
        assert!(!id.is_unset());

        let stored = repo.get(id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.file_name, "a.bin");
        assert_eq!(stored.status, TaskStatus::Paused);
        assert_eq!(stored.total_bytes, 1000);
        assert!(stored.supports_resume);
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_id() {
        let repo = repo().await;
        let id = repo.insert_or_update(&new_task("a.bin")).await.unwrap();

        let mut task = repo.get(id).await.unwrap().unwrap();
        task.message = "hello".to_string();
        let same = repo.insert_or_update(&task).await.unwrap();
        assert_eq!(same, id);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
        assert_eq!(repo.get(id).await.unwrap().unwrap().message, "hello");
    }

    #[tokio::test]
    async fn test_duplicate_file_key_is_constraint_error() {
        let repo = repo().await;
        repo.insert_or_update(&new_task("a.bin")).await.unwrap();
        let err = repo.insert_or_update(&new_task("a.bin")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_find_by_file() {
        let repo = repo().await;
        let id = repo.insert_or_update(&new_task("a.bin")).await.unwrap();

        let found = repo.find_by_file("a.bin", DEFAULT_MIME_TYPE).await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(id));
        assert!(repo.find_by_file("a.bin", "text/plain").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_progress_reports_missing_row() {
        let repo = repo().await;
        let update = TaskProgress::new(TaskId::new(99), TaskStatus::Active, 10, 100);
        assert!(!repo.update_progress(&update).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_progress_writes_all_fields() {
        let repo = repo().await;
        let id = repo.insert_or_update(&new_task("a.bin")).await.unwrap();

        let update = TaskProgress::new(id, TaskStatus::Active, 400, 1000)
            .with_speed("4.0 KB/s")
            .with_message("");
        assert!(repo.update_progress(&update).await.unwrap());

        let stored = repo.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Active);
        assert_eq!(stored.downloaded_bytes, 400);
        assert!((stored.progress - 40.0).abs() < 1e-9);
        assert_eq!(stored.speed, "4.0 KB/s");

        // None leaves the message alone
        repo.update_progress(&update.clone().with_message("network down"))
            .await
            .unwrap();
        let mut untouched = update;
        untouched.message = None;
        repo.update_progress(&untouched).await.unwrap();
        assert_eq!(repo.get(id).await.unwrap().unwrap().message, "network down");
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let repo = repo().await;
        let a = repo.insert_or_update(&new_task("a.bin")).await.unwrap();
        let b = repo.insert_or_update(&new_task("b.bin")).await.unwrap();
        repo.update_progress(&TaskProgress::new(b, TaskStatus::Completed, 1000, 1000))
            .await
            .unwrap();

        let paused = repo.list_by_status(&[TaskStatus::Paused]).await.unwrap();
        assert_eq!(paused.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a]);

        let both = repo
            .list_by_status(&[TaskStatus::Paused, TaskStatus::Completed])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
        assert!(repo.list_by_status(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_next_queued_is_oldest() {
        let repo = repo().await;
        let first = repo.insert_or_update(&new_task("a.bin")).await.unwrap();
        let second = repo.insert_or_update(&new_task("b.bin")).await.unwrap();

        repo.update_progress(&TaskProgress::new(second, TaskStatus::Queued, 0, 1000))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.update_progress(&TaskProgress::new(first, TaskStatus::Queued, 0, 1000))
            .await
            .unwrap();

        assert_eq!(repo.next_queued().await.unwrap().map(|t| t.id), Some(second));

        // Re-writing Queued does not reset the wait time
        repo.update_progress(&TaskProgress::new(second, TaskStatus::Queued, 0, 1000))
            .await
            .unwrap();
        assert_eq!(repo.next_queued().await.unwrap().map(|t| t.id), Some(second));

        repo.update_progress(&TaskProgress::new(second, TaskStatus::Active, 0, 1000))
            .await
            .unwrap();
        assert_eq!(repo.next_queued().await.unwrap().map(|t| t.id), Some(first));
    }

    #[tokio::test]
    async fn test_delete_and_change_feed() {
        let repo = repo().await;
        let mut changes = repo.subscribe();

        let id = repo.insert_or_update(&new_task("a.bin")).await.unwrap();
        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert!(repo.get(id).await.unwrap().is_none());

        assert_eq!(changes.recv().await.unwrap().kind, TaskChangeKind::Upserted);
        let deleted = changes.recv().await.unwrap();
        assert_eq!(deleted, TaskChange::deleted(id));
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pool_accessor() {
        let repo = repo().await;
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM download_tasks")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
