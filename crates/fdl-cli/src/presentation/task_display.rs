//! Task table rendering.

use fdl_core::{DownloadTask, TaskStatus, format_bytes};

use super::tables::{print_separator, truncate_string};

/// Short status label for tables.
pub const fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Active => "active",
        TaskStatus::Paused => "paused",
        TaskStatus::Queued => "queued",
        TaskStatus::Completed => "done",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn size_column(task: &DownloadTask) -> String {
    if task.total_bytes > 0 {
        format!(
            "{}/{}",
            format_bytes(task.downloaded_bytes),
            format_bytes(task.total_bytes)
        )
    } else {
        format_bytes(task.downloaded_bytes)
    }
}

/// Render one table row.
pub(crate) fn task_row(task: &DownloadTask) -> String {
    format!(
        "{:<5} {:<10} {:>6.1}% {:<22} {:<26} {}",
        task.id.get(),
        status_label(task.status),
        task.progress,
        size_column(task),
        truncate_string(&task.file_name, 26),
        truncate_string(&task.message, 40),
    )
}

/// Print tasks as a table.
pub fn print_task_table(tasks: &[DownloadTask]) {
    println!(
        "{:<5} {:<10} {:>7} {:<22} {:<26} Message",
        "ID", "Status", "Done", "Size", "File"
    );
    print_separator(100);
    for task in tasks {
        println!("{}", task_row(task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdl_core::{DEFAULT_MIME_TYPE, RemoteFileMeta, TaskId};

    #[test]
    fn test_task_row() {
        let mut task = DownloadTask::from_meta(&RemoteFileMeta {
            url: "https://example.com/a.bin".to_string(),
            file_name: "a.bin".to_string(),
            total_bytes: 2048,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            supports_resume: true,
        });
        task.id = TaskId::new(7);
        task.downloaded_bytes = 1024;
        task.refresh_progress();

        let row = task_row(&task);
        assert!(row.starts_with("7 "));
        assert!(row.contains("paused"));
        assert!(row.contains("50.0%"));
        assert!(row.contains("a.bin"));
    }
}
