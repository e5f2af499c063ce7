//! Task identifiers, status machine, and the persisted task record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::progress::{IDLE_SPEED, progress_percent};

/// Fallback MIME type when a server does not send `Content-Type`.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Stable identifier of a persisted download task.
///
/// The value `0` means "not yet persisted"; the store assigns a real id on
/// first insert and it never changes afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Sentinel for a task that has not been inserted yet.
    pub const UNSET: Self = Self(0);

    /// Wrap a raw store id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this id still needs to be assigned by the store.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 <= 0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Lifecycle status of a task.
///
/// `Active -> {Paused, Completed, Cancelled}`, `Paused -> {Active, Cancelled}`,
/// `Queued -> {Active, Paused, Cancelled}`. `Completed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// A transfer job is (or, before reconciliation, was) running.
    Active,
    /// Stopped by the user or by a recoverable failure; resumable.
    Paused,
    /// Waiting for an admission slot.
    Queued,
    /// Promoted to public storage.
    Completed,
    /// Abandoned by the user; partial bytes discarded.
    Cancelled,
}

impl TaskStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 5] = [
        Self::Active,
        Self::Queued,
        Self::Paused,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Convert to string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Queued => "queued",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from string representation.
    ///
    /// Unknown values map to `Paused`, the safest resumable state.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "queued" => Self::Queued,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Paused,
        }
    }

    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the task belongs in the "active" projection.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Active | Self::Paused | Self::Queued)
    }

    /// Check a status transition against the lifecycle machine.
    ///
    /// Self-transitions are allowed so repeated writes of the same status
    /// (throttled progress while `Active`) are accepted. `Active -> Queued`
    /// only happens to a row left `Active` by a superseded job.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use TaskStatus::{Active, Cancelled, Completed, Paused, Queued};
        match (self, next) {
            (Completed, Completed) | (Cancelled, Cancelled) => true,
            (Completed | Cancelled, _) => false,
            (Active, _)
            | (Paused, Paused | Active | Queued | Cancelled)
            | (Queued, Queued | Active | Paused | Cancelled) => true,
            (Paused | Queued, Completed) => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata learned from probing a URL, before any body bytes are read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileMeta {
    /// URL that was probed.
    pub url: String,
    /// File name from `Content-Disposition` or the URL path.
    pub file_name: String,
    /// `Content-Length`, or 0 when absent.
    pub total_bytes: i64,
    /// `Content-Type`, or [`DEFAULT_MIME_TYPE`].
    pub mime_type: String,
    /// Server advertised byte-range support.
    pub supports_resume: bool,
}

/// The persisted record of one user-requested download.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: TaskId,
    pub file_name: String,
    pub url: String,
    pub mime_type: String,
    /// 0 while unknown.
    pub total_bytes: i64,
    pub downloaded_bytes: i64,
    /// Derived percentage in `0.0..=100.0`.
    pub progress: f64,
    /// Human-readable throughput, meaningful only while `Active`.
    pub speed: String,
    pub status: TaskStatus,
    /// Last error or informational string.
    pub message: String,
    pub supports_resume: bool,
    /// Metadata fetch in flight for this row.
    pub is_loading: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DownloadTask {
    /// Build an unsaved task (status `Paused`, no progress) from probe metadata.
    #[must_use]
    pub fn from_meta(meta: &RemoteFileMeta) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::UNSET,
            file_name: meta.file_name.clone(),
            url: meta.url.clone(),
            mime_type: meta.mime_type.clone(),
            total_bytes: meta.total_bytes,
            downloaded_bytes: 0,
            progress: 0.0,
            speed: IDLE_SPEED.to_string(),
            status: TaskStatus::Paused,
            message: String::new(),
            supports_resume: meta.supports_resume,
            is_loading: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute `progress` from the byte counters.
    pub fn refresh_progress(&mut self) {
        self.progress = progress_percent(self.downloaded_bytes, self.total_bytes);
    }
}

/// Atomic progress/status mutation applied through the task store.
///
/// This is the single write path used by the transfer engine; every field is
/// written in one statement so readers never observe a torn task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskProgress {
    pub id: TaskId,
    pub status: TaskStatus,
    pub downloaded_bytes: i64,
    pub total_bytes: i64,
    pub progress: f64,
    pub speed: String,
    /// `Some` replaces the stored message, `None` leaves it untouched.
    pub message: Option<String>,
}

impl TaskProgress {
    /// Build an update whose percentage is derived from the byte counters.
    #[must_use]
    pub fn new(id: TaskId, status: TaskStatus, downloaded_bytes: i64, total_bytes: i64) -> Self {
        Self {
            id,
            status,
            downloaded_bytes,
            total_bytes,
            progress: progress_percent(downloaded_bytes, total_bytes),
            speed: IDLE_SPEED.to_string(),
            message: None,
        }
    }

    /// Set the throughput string.
    #[must_use]
    pub fn with_speed(mut self, speed: impl Into<String>) -> Self {
        self.speed = speed.into();
        self
    }

    /// Replace the stored message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Override the derived percentage.
    #[must_use]
    pub const fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), status);
        }
        assert_eq!(TaskStatus::parse("garbage"), TaskStatus::Paused);
    }

    #[test]
    fn test_terminal_statuses_are_sticky() {
        for next in TaskStatus::ALL {
            assert_eq!(
                TaskStatus::Completed.can_transition_to(next),
                next == TaskStatus::Completed
            );
            assert_eq!(
                TaskStatus::Cancelled.can_transition_to(next),
                next == TaskStatus::Cancelled
            );
        }
    }

    #[test]
    fn test_lifecycle_edges() {
        assert!(TaskStatus::Active.can_transition_to(TaskStatus::Paused));
        assert!(TaskStatus::Active.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Paused.can_transition_to(TaskStatus::Active));
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Active));
        assert!(!TaskStatus::Paused.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn test_task_id_unset() {
        assert!(TaskId::UNSET.is_unset());
        assert!(!TaskId::new(7).is_unset());
        assert_eq!("42".parse::<TaskId>().unwrap(), TaskId::new(42));
    }

    #[test]
    fn test_from_meta_starts_paused() {
        let meta = RemoteFileMeta {
            url: "https://example.com/a.bin".to_string(),
            file_name: "a.bin".to_string(),
            total_bytes: 1000,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            supports_resume: true,
        };
        let task = DownloadTask::from_meta(&meta);
        assert!(task.id.is_unset());
        assert_eq!(task.status, TaskStatus::Paused);
        assert_eq!(task.downloaded_bytes, 0);
        assert_eq!(task.total_bytes, 1000);
    }

    #[test]
    fn test_progress_update_derives_percent() {
        let update = TaskProgress::new(TaskId::new(1), TaskStatus::Active, 250, 1000);
        assert!((update.progress - 25.0).abs() < f64::EPSILON);
        let unknown = TaskProgress::new(TaskId::new(1), TaskStatus::Active, 250, 0);
        assert!(unknown.progress.abs() < f64::EPSILON);
    }
}
