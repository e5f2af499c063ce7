//! Delete command handler.
//!
//! Only completed and cancelled tasks can be deleted. Deleting a completed
//! task also removes its file from the downloads directory.

use anyhow::Result;

use fdl_download::{DownloadManagerPort, TaskId};

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, id: i64) -> Result<()> {
    let id = TaskId::new(id);
    ctx.downloads().delete(id).await.map_err(CliError::from)?;
    println!("Deleted #{id}");
    Ok(())
}
