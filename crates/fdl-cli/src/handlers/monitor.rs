//! Foreground progress monitor.
//!
//! Draws one bar per running task from the projection and returns once no
//! job is left. Ctrl+C pauses every running job before returning.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use fdl_core::{DownloadTask, ProjectionSnapshot, TaskId, TaskStatus};
use fdl_download::DownloadManagerPort;

use crate::bootstrap::CliContext;
use crate::presentation::truncate_string;

/// How often the monitor re-checks for idleness without a projection change.
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Consecutive idle polls tolerated while tasks are still marked queued.
const IDLE_POLLS_BEFORE_EXIT: u32 = 5;

const LABEL_WIDTH: usize = 32;

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg:32} {bar:28.cyan/blue} {bytes:>9} / {total_bytes:>9} ({percent:>3}%) {prefix}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg:32} {bytes:>9} {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn as_len(bytes: i64) -> u64 {
    u64::try_from(bytes).unwrap_or(0)
}

/// Bars keyed by task id, reconciled against each snapshot.
pub(crate) struct TaskBars {
    multi: MultiProgress,
    bars: HashMap<TaskId, ProgressBar>,
}

impl TaskBars {
    pub(crate) fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: HashMap::new(),
        }
    }

    fn bar_for(&mut self, task: &DownloadTask) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(task.id).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(as_len(task.total_bytes)));
            bar.set_message(truncate_string(&task.file_name, LABEL_WIDTH));
            bar
        })
    }

    fn update(&mut self, task: &DownloadTask) {
        let bar = self.bar_for(task);
        if task.total_bytes > 0 {
            bar.set_style(bar_style());
            bar.set_length(as_len(task.total_bytes));
        } else {
            bar.set_style(spinner_style());
            bar.tick();
        }
        bar.set_position(as_len(task.downloaded_bytes));
        let note = if task.status == TaskStatus::Queued {
            "queued".to_string()
        } else {
            task.speed.clone()
        };
        bar.set_prefix(note);
    }

    /// Reconcile the bars with `snapshot`.
    pub(crate) fn sync(&mut self, snapshot: &ProjectionSnapshot) {
        for task in snapshot.active.values() {
            match task.status {
                TaskStatus::Active | TaskStatus::Queued => self.update(task),
                _ => {
                    if let Some(bar) = self.bars.remove(&task.id) {
                        let note = if task.message.is_empty() {
                            "paused".to_string()
                        } else {
                            format!("paused: {}", truncate_string(&task.message, 60))
                        };
                        bar.abandon_with_message(format!(
                            "{} {note}",
                            truncate_string(&task.file_name, LABEL_WIDTH)
                        ));
                    }
                }
            }
        }

        for task in snapshot.completed.values() {
            if let Some(bar) = self.bars.remove(&task.id) {
                bar.set_position(as_len(task.total_bytes));
                bar.set_prefix("done");
                bar.finish();
            }
        }

        self.bars.retain(|id, bar| {
            if snapshot.get(*id).is_some() {
                return true;
            }
            bar.abandon_with_message(format!("#{id} cancelled"));
            false
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.bars.len()
    }
}

/// Follow running tasks until none is left or Ctrl+C is pressed.
pub async fn run(ctx: &CliContext) -> Result<()> {
    let manager = ctx.downloads();
    let mut rx = manager.subscribe();
    let mut bars = TaskBars::new(ctx.progress.clone());
    bars.sync(&rx.borrow_and_update());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut idle_polls = 0u32;

    loop {
        if manager.running_count().await == 0 {
            idle_polls += 1;
            let pending = rx.borrow().has_pending_work();
            if !pending || idle_polls >= IDLE_POLLS_BEFORE_EXIT {
                break;
            }
        } else {
            idle_polls = 0;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                bars.sync(&rx.borrow_and_update());
            }
            signal = &mut ctrl_c => {
                signal?;
                ctx.progress.println("Pausing downloads...")?;
                manager.shutdown().await;
                bars.sync(&manager.snapshot());
                println!("Paused. Run 'fdl resume --all' to continue.");
                return Ok(());
            }
            () = tokio::time::sleep(IDLE_POLL) => {}
        }
    }

    bars.sync(&manager.snapshot());
    Ok(())
}
