//! Download orchestration for fdl.
//!
//! Turns a URL into a persisted task, runs a bounded number of resumable
//! transfers, and publishes a live projection of every task.
//!
//! - `resolver` - `HEAD` probe, header parsing, task creation and dedup
//! - `admission` - concurrency bound, job registry, queue promotion
//! - `transfer` - ranged GET streaming into the partial file
//! - `reconcile` - startup repair of tasks left `Active` by a crash
//! - `projection` - `watch`-based snapshot for subscribers
//! - `notify` - event to notification bridge
//! - `manager` - `DownloadManagerPort` facade and composition
#![deny(unused_crate_dependencies)]

pub(crate) mod admission;
mod http;
mod manager;
mod notify;
mod partial;
pub(crate) mod progress;
mod projection;
mod reconcile;
mod resolver;
mod storage;
pub(crate) mod transfer;

// Re-export core types for convenience
pub use fdl_core::{
    DownloadError, DownloadEvent, DownloadManagerConfig, DownloadManagerPort, ProjectionSnapshot,
    TaskId, TaskStatus,
};

pub use admission::Admission;
pub use http::build_client;
pub use manager::{DownloadManagerDeps, DownloadManagerImpl, build_download_manager};
pub use notify::NotificationBridge;
pub use partial::PartialFileStore;
pub use projection::TaskProjection;
pub use reconcile::{ReconcileReport, StartupReconciler};
pub use resolver::MetadataResolver;
pub use storage::DownloadsDirStorage;
pub use transfer::{StopReason, TransferOutcome};
