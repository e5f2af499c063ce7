//! Cancel command handler.

use anyhow::Result;

use fdl_download::{DownloadManagerPort, TaskId};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Cancel a task and discard its partial data.
pub async fn execute(ctx: &CliContext, id: i64) -> Result<()> {
    let id = TaskId::new(id);
    ctx.downloads().cancel(id).await.map_err(CliError::from)?;
    println!("Cancelled #{id}");
    Ok(())
}
