//! Resume command handler.

use anyhow::Result;

use fdl_core::TaskStatus;
use fdl_download::{DownloadManagerPort, TaskId};

use crate::bootstrap::CliContext;
use crate::handlers::monitor;

/// Resume the given tasks (or every paused/queued one) and follow them.
pub async fn execute(ctx: &CliContext, ids: &[i64], all: bool) -> Result<()> {
    let ids: Vec<TaskId> = if all {
        ctx.tasks()
            .list_by_status(&[TaskStatus::Paused, TaskStatus::Queued])
            .await?
            .into_iter()
            .map(|task| task.id)
            .collect()
    } else {
        ids.iter().copied().map(TaskId::new).collect()
    };

    if ids.is_empty() {
        println!("Nothing to resume.");
        return Ok(());
    }

    let mut resumed = 0usize;
    for id in ids {
        match ctx.downloads().resume(id).await {
            Ok(()) => {
                println!("Resumed #{id}");
                resumed += 1;
            }
            Err(e) => eprintln!("#{id}: {}", e.user_message()),
        }
    }

    if resumed == 0 {
        return Ok(());
    }
    ctx.downloads().start_queued().await?;
    monitor::run(ctx).await
}
