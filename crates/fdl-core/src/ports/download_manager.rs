//! Download manager port definition.
//!
//! This port defines the public control surface of the download subsystem.
//! It hides HTTP clients, cancellation tokens, and the job registry behind a
//! small async API.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::download::{DownloadError, ProjectionSnapshot, TaskId};

/// Browser-style identifying header sent with every probe and transfer.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for creating a download manager.
#[derive(Debug, Clone)]
pub struct DownloadManagerConfig {
    /// Private directory holding partial files, one per task.
    pub cache_dir: PathBuf,
    /// Public directory completed files are promoted into.
    pub downloads_dir: PathBuf,
    /// Maximum concurrently running transfers.
    pub max_concurrent: u32,
    /// Bytes written per loop iteration.
    pub chunk_size: usize,
    /// Minimum time between throttled durable progress writes.
    pub persist_interval: Duration,
    /// Integer percent advance that forces a durable write.
    pub persist_percent_step: u32,
    /// Transport connect timeout.
    pub connect_timeout: Duration,
    /// Transport read timeout (per read, not per request).
    pub read_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for DownloadManagerConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("partial"),
            downloads_dir: PathBuf::from("downloads"),
            max_concurrent: 4,
            chunk_size: 8 * 1024,
            persist_interval: Duration::from_secs(1),
            persist_percent_step: 1,
            connect_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(60),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DownloadManagerConfig {
    /// Create a config with the two storage locations.
    #[must_use]
    pub fn new(cache_dir: PathBuf, downloads_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            downloads_dir,
            ..Default::default()
        }
    }

    /// Set the maximum concurrent downloads (at least 1).
    #[must_use]
    pub const fn with_max_concurrent(mut self, max: u32) -> Self {
        self.max_concurrent = if max == 0 { 1 } else { max };
        self
    }

    /// Set the per-iteration chunk size (at least 1 byte).
    #[must_use]
    pub const fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = if size == 0 { 1 } else { size };
        self
    }

    /// Set the durable-write interval.
    #[must_use]
    pub const fn with_persist_interval(mut self, interval: Duration) -> Self {
        self.persist_interval = interval;
        self
    }

    /// Set both transport timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Port for controlling downloads.
///
/// # Usage
///
/// ```ignore
/// let manager: Arc<dyn DownloadManagerPort> = /* ... */;
/// let id = manager.resolve_and_start("https://example.com/file.zip").await?;
/// let mut view = manager.subscribe();
/// manager.pause(id).await?;
/// manager.resume(id).await?;
/// ```
#[async_trait]
pub trait DownloadManagerPort: Send + Sync {
    /// Probe a URL, create (or reuse) its task, and admit it.
    ///
    /// A job already running for the task is replaced by a fresh one.
    async fn resolve_and_start(&self, url: &str) -> Result<TaskId, DownloadError>;

    /// Stop a running or queued task, keeping it resumable.
    async fn pause(&self, id: TaskId) -> Result<(), DownloadError>;

    /// Admit a paused or queued task again.
    ///
    /// A running task is left alone. A task whose job is still stopping is
    /// waited for and then admitted, so the resume is never lost.
    async fn resume(&self, id: TaskId) -> Result<(), DownloadError>;

    /// Stop a task and discard its partial bytes.
    async fn cancel(&self, id: TaskId) -> Result<(), DownloadError>;

    /// Remove a finished task (and its promoted file when completed).
    async fn delete(&self, id: TaskId) -> Result<(), DownloadError>;

    /// Subscribe to the active/completed projection and the loading flag.
    fn subscribe(&self) -> watch::Receiver<ProjectionSnapshot>;

    /// Number of transfer jobs currently holding a slot.
    async fn running_count(&self) -> usize;

    /// Pause every running job and wait for them to settle.
    async fn shutdown(&self);
}
