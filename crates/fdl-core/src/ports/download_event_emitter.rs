//! Download event emitter port.
//!
//! This port abstracts download event emission, allowing the download
//! manager to emit events without coupling to the consumer (notification
//! adapter, terminal renderer, tests).

use tokio::sync::mpsc;

use crate::download::DownloadEvent;

/// Port for emitting download events.
///
/// Implementations must not block; the transfer loop calls this inline.
pub trait DownloadEventEmitterPort: Send + Sync {
    /// Emit a download event.
    fn emit(&self, event: DownloadEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort>;
}

/// A no-op download event emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopDownloadEmitter;

impl NoopDownloadEmitter {
    /// Create a new no-op download emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DownloadEventEmitterPort for NoopDownloadEmitter {
    fn emit(&self, _event: DownloadEvent) {}

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Emitter that forwards events into an unbounded channel.
///
/// The receiving half is drained by a separate task, so `emit` never waits.
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelDownloadEmitter {
    tx: mpsc::UnboundedSender<DownloadEvent>,
}

impl ChannelDownloadEmitter {
    /// Create an emitter and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DownloadEventEmitterPort for ChannelDownloadEmitter {
    fn emit(&self, event: DownloadEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("download event dropped, receiver closed");
        }
    }

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::download::TaskId;

    #[test]
    fn test_noop_emitter() {
        let emitter: Arc<dyn DownloadEventEmitterPort> = Arc::new(NoopDownloadEmitter::new());
        emitter.emit(DownloadEvent::queued(TaskId::new(1)));
        let _boxed = emitter.clone_box();
    }

    #[test]
    fn test_channel_emitter_forwards_in_order() {
        let (emitter, mut rx) = ChannelDownloadEmitter::new();
        emitter.emit(DownloadEvent::queued(TaskId::new(1)));
        emitter.clone_box().emit(DownloadEvent::cancelled(TaskId::new(1)));

        assert_eq!(rx.try_recv().unwrap(), DownloadEvent::queued(TaskId::new(1)));
        assert_eq!(rx.try_recv().unwrap(), DownloadEvent::cancelled(TaskId::new(1)));
    }

    #[test]
    fn test_channel_emitter_survives_closed_receiver() {
        let (emitter, rx) = ChannelDownloadEmitter::new();
        drop(rx);
        emitter.emit(DownloadEvent::queued(TaskId::new(2)));
    }
}
