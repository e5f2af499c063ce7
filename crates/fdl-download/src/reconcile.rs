//! Startup reconciliation.
//!
//! Runs once before any job can be admitted. An `Active` row at that point
//! was left behind by an unclean shutdown and is forced to `Paused`.

use std::sync::Arc;

use fdl_core::{DownloadError, TaskId, TaskProgress, TaskRepositoryPort, TaskStatus};

/// What reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub paused: Vec<TaskId>,
}

pub struct StartupReconciler {
    repo: Arc<dyn TaskRepositoryPort>,
}

impl StartupReconciler {
    pub fn new(repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { repo }
    }

    /// Force every ghost `Active` task to `Paused`.
    ///
    /// A failed write for one task is logged and does not stop the others.
    pub async fn reconcile(&self) -> Result<ReconcileReport, DownloadError> {
        let ghosts = self.repo.list_by_status(&[TaskStatus::Active]).await?;
        let mut report = ReconcileReport::default();

        for task in ghosts {
            let update = TaskProgress::new(
                task.id,
                TaskStatus::Paused,
                task.downloaded_bytes,
                task.total_bytes,
            );
            match self.repo.update_progress(&update).await {
                Ok(true) => report.paused.push(task.id),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "failed to pause stale task");
                }
            }
        }

        if !report.paused.is_empty() {
            tracing::info!(count = report.paused.len(), "stale active tasks paused");
        }
        Ok(report)
    }
}
