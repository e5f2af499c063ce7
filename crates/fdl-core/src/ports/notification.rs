//! Notification sink port.
//!
//! Fire-and-forget progress/complete/cancel calls. The core never consumes a
//! return value and never waits for delivery.

use crate::download::TaskId;

/// Port for user-facing download notifications.
pub trait NotificationPort: Send + Sync {
    /// Show or refresh the running progress notification for a task.
    fn show_progress(&self, id: TaskId, title: &str, percent: u8);

    /// Announce that a task finished.
    fn show_complete(&self, id: TaskId, title: &str);

    /// Dismiss the running notification for a task.
    fn cancel(&self, id: TaskId);
}

/// Notification sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotificationPort for NoopNotifier {
    fn show_progress(&self, _id: TaskId, _title: &str, _percent: u8) {}
    fn show_complete(&self, _id: TaskId, _title: &str) {}
    fn cancel(&self, _id: TaskId) {}
}
