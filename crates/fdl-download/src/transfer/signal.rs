//! Per-job stop requests.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

/// Why a job was asked to stop.
///
/// Ordered by strength: a stronger request overrides a weaker one already
/// pending, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StopReason {
    /// Keep the partial and settle as `Paused`.
    Pause,
    /// Discard the partial and settle as `Cancelled`.
    Cancel,
    /// A newer job for the same task replaced this one; write nothing.
    Supersede,
}

/// Cancellation token plus the reason it fired.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    reason: Arc<Mutex<Option<StopReason>>>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the job to stop.
    pub fn request(&self, reason: StopReason) {
        {
            let mut current = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
            if current.is_none_or(|existing| reason > existing) {
                *current = Some(reason);
            }
        }
        self.token.cancel();
    }

    /// The strongest reason requested so far.
    pub fn reason(&self) -> Option<StopReason> {
        *self.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once any stop has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }
}
