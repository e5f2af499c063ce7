//! List command handler.

use anyhow::Result;

use fdl_core::TaskStatus;

use crate::bootstrap::CliContext;
use crate::presentation::print_task_table;

/// Execute the list command.
///
/// Shows every stored task, newest first, optionally filtered by status.
pub async fn execute(ctx: &CliContext, status: Option<TaskStatus>) -> Result<()> {
    let tasks = match status {
        Some(status) => ctx.tasks().list_by_status(&[status]).await?,
        None => ctx.tasks().list_all().await?,
    };

    if tasks.is_empty() {
        println!("No downloads found.");
        println!("Use 'fdl get <url>' to start one.");
        return Ok(());
    }

    println!("Found {} download(s):\n", tasks.len());
    print_task_table(&tasks);
    Ok(())
}
