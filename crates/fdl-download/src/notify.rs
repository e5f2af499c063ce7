//! Bridge from download events to a notification sink.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use fdl_core::{DownloadEvent, NotificationPort};

/// Drains an event channel into a [`NotificationPort`].
pub struct NotificationBridge;

impl NotificationBridge {
    /// Spawn the bridge; it ends when every sender is dropped.
    pub fn spawn(
        mut events: mpsc::UnboundedReceiver<DownloadEvent>,
        notifier: Arc<dyn NotificationPort>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                dispatch(&event, notifier.as_ref());
            }
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_percent(percentage: f64) -> u8 {
    if percentage.is_finite() {
        percentage.clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

fn dispatch(event: &DownloadEvent, notifier: &dyn NotificationPort) {
    match event {
        DownloadEvent::TaskProgress {
            id,
            file_name,
            percentage,
            ..
        } => notifier.show_progress(*id, file_name, clamp_percent(*percentage)),
        DownloadEvent::TaskCompleted { id, file_name } => {
            notifier.cancel(*id);
            notifier.show_complete(*id, file_name);
        }
        DownloadEvent::TaskPaused { id, .. }
        | DownloadEvent::TaskCancelled { id }
        | DownloadEvent::TaskRemoved { id } => notifier.cancel(*id),
        DownloadEvent::TaskStarted { .. } | DownloadEvent::TaskQueued { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdl_core::TaskId;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Notifier {}
        impl NotificationPort for Notifier {
            fn show_progress(&self, id: TaskId, title: &str, percent: u8);
            fn show_complete(&self, id: TaskId, title: &str);
            fn cancel(&self, id: TaskId);
        }
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(42.9), 42);
        assert_eq!(clamp_percent(150.0), 100);
        assert_eq!(clamp_percent(-1.0), 0);
        assert_eq!(clamp_percent(f64::NAN), 0);
    }

    #[test]
    fn test_progress_maps_to_show_progress() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_show_progress()
            .withf(|id, title, percent| *id == TaskId::new(1) && title == "a.bin" && *percent == 40)
            .times(1)
            .return_const(());

        dispatch(
            &DownloadEvent::progress(TaskId::new(1), "a.bin", 400, 1000, 40.0, "1.0 KB/s"),
            &notifier,
        );
    }

    #[test]
    fn test_completion_replaces_progress_notification() {
        let mut notifier = MockNotifier::new();
        let mut seq = mockall::Sequence::new();
        notifier
            .expect_cancel()
            .with(eq(TaskId::new(2)))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        notifier
            .expect_show_complete()
            .withf(|id, title| *id == TaskId::new(2) && title == "b.bin")
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        dispatch(&DownloadEvent::completed(TaskId::new(2), "b.bin"), &notifier);
    }

    #[test]
    fn test_stop_events_dismiss() {
        let mut notifier = MockNotifier::new();
        notifier.expect_cancel().times(3).return_const(());
        notifier.expect_show_progress().never();

        dispatch(&DownloadEvent::paused(TaskId::new(3), 10, None), &notifier);
        dispatch(&DownloadEvent::cancelled(TaskId::new(3)), &notifier);
        dispatch(&DownloadEvent::removed(TaskId::new(3)), &notifier);
        dispatch(&DownloadEvent::queued(TaskId::new(3)), &notifier);
    }

    #[tokio::test]
    async fn test_bridge_drains_until_senders_drop() {
        let mut notifier = MockNotifier::new();
        notifier.expect_cancel().times(1).return_const(());
        notifier.expect_show_complete().times(1).return_const(());

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = NotificationBridge::spawn(rx, Arc::new(notifier));
        tx.send(DownloadEvent::completed(TaskId::new(4), "c.bin")).unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
