//! Terminal notification sink.
//!
//! Progress is already drawn by the monitor's bars, so only completions
//! produce output here.

use indicatif::MultiProgress;

use fdl_core::{NotificationPort, TaskId};

/// Prints completion lines above the live progress bars.
#[derive(Clone)]
pub struct TerminalNotifier {
    multi: MultiProgress,
}

impl TerminalNotifier {
    pub const fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl NotificationPort for TerminalNotifier {
    fn show_progress(&self, id: TaskId, title: &str, percent: u8) {
        tracing::trace!(task_id = %id, title, percent, "progress notification");
    }

    fn show_complete(&self, id: TaskId, title: &str) {
        if let Err(e) = self.multi.println(format!("✓ #{id} {title} downloaded")) {
            tracing::debug!(task_id = %id, error = %e, "failed to print completion");
        }
    }

    fn cancel(&self, id: TaskId) {
        tracing::trace!(task_id = %id, "notification dismissed");
    }
}
