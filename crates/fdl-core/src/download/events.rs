//! Download events - discriminated union for task lifecycle changes.
//!
//! The transfer engine and admission controller emit these through a
//! [`DownloadEventEmitterPort`](crate::ports::DownloadEventEmitterPort).
//! Consumers (notification bridge, front ends) receive them asynchronously;
//! emission never blocks a transfer.

use serde::{Deserialize, Serialize};

use super::types::TaskId;

/// Single discriminated union for all download events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// A transfer job began streaming.
    TaskStarted {
        /// Task id.
        id: TaskId,
        /// File being downloaded.
        file_name: String,
        /// Resume offset in bytes (0 for a fresh start).
        offset: i64,
    },

    /// Progress tick that also reached the durable store.
    TaskProgress {
        /// Task id.
        id: TaskId,
        /// File being downloaded.
        file_name: String,
        /// Bytes written so far.
        downloaded: i64,
        /// Total bytes (0 when unknown).
        total: i64,
        /// Percentage (0.0 - 100.0).
        percentage: f64,
        /// Human-readable throughput.
        speed: String,
    },

    /// No admission slot was free; the task is waiting.
    TaskQueued {
        /// Task id.
        id: TaskId,
    },

    /// The task stopped and can be resumed.
    TaskPaused {
        /// Task id.
        id: TaskId,
        /// Bytes on disk at the stop point.
        downloaded: i64,
        /// Failure text when the pause was caused by an error.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The file was promoted to public storage.
    TaskCompleted {
        /// Task id.
        id: TaskId,
        /// File that was downloaded.
        file_name: String,
    },

    /// The task was cancelled and its partial bytes discarded.
    TaskCancelled {
        /// Task id.
        id: TaskId,
    },

    /// The task row was deleted.
    TaskRemoved {
        /// Task id.
        id: TaskId,
    },
}

impl DownloadEvent {
    /// Create a started event.
    pub fn started(id: TaskId, file_name: impl Into<String>, offset: i64) -> Self {
        Self::TaskStarted {
            id,
            file_name: file_name.into(),
            offset,
        }
    }

    /// Create a progress event.
    pub fn progress(
        id: TaskId,
        file_name: impl Into<String>,
        downloaded: i64,
        total: i64,
        percentage: f64,
        speed: impl Into<String>,
    ) -> Self {
        Self::TaskProgress {
            id,
            file_name: file_name.into(),
            downloaded,
            total,
            percentage,
            speed: speed.into(),
        }
    }

    /// Create a queued event.
    #[must_use]
    pub const fn queued(id: TaskId) -> Self {
        Self::TaskQueued { id }
    }

    /// Create a paused event.
    #[must_use]
    pub const fn paused(id: TaskId, downloaded: i64, reason: Option<String>) -> Self {
        Self::TaskPaused {
            id,
            downloaded,
            reason,
        }
    }

    /// Create a completed event.
    pub fn completed(id: TaskId, file_name: impl Into<String>) -> Self {
        Self::TaskCompleted {
            id,
            file_name: file_name.into(),
        }
    }

    /// Create a cancelled event.
    #[must_use]
    pub const fn cancelled(id: TaskId) -> Self {
        Self::TaskCancelled { id }
    }

    /// Create a removed event.
    #[must_use]
    pub const fn removed(id: TaskId) -> Self {
        Self::TaskRemoved { id }
    }

    /// Get the task id from any event type.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        match self {
            Self::TaskStarted { id, .. }
            | Self::TaskProgress { id, .. }
            | Self::TaskQueued { id }
            | Self::TaskPaused { id, .. }
            | Self::TaskCompleted { id, .. }
            | Self::TaskCancelled { id }
            | Self::TaskRemoved { id } => *id,
        }
    }

    /// Get the event name for wire protocols.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::TaskStarted { .. } => "download:started",
            Self::TaskProgress { .. } => "download:progress",
            Self::TaskQueued { .. } => "download:queued",
            Self::TaskPaused { .. } => "download:paused",
            Self::TaskCompleted { .. } => "download:completed",
            Self::TaskCancelled { .. } => "download:cancelled",
            Self::TaskRemoved { .. } => "download:removed",
        }
    }

    /// Whether this event ends the running phase of a task.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TaskPaused { .. } | Self::TaskCompleted { .. } | Self::TaskCancelled { .. }
        )
    }
}
