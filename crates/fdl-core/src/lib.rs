//! Core domain types and port definitions for fdl.
//!
//! `fdl-core` holds everything the download subsystem agrees on without
//! touching the network, the database, or the terminal:
//!
//! - `download` - task record, status machine, events, errors, formatting
//! - `ports` - traits implemented by adapters (`fdl-db`, `fdl-download`, `fdl-cli`)
//! - `paths` - data root, database, partial cache and downloads locations
#![deny(unused_crate_dependencies)]

pub mod download;
pub mod paths;
pub mod ports;

pub use download::{
    DEFAULT_MIME_TYPE, DownloadError, DownloadEvent, DownloadResult, DownloadTask, IDLE_SPEED,
    ProjectionSnapshot, RemoteFileMeta, TaskId, TaskProgress, TaskStatus, format_bytes,
    format_speed, progress_percent,
};
pub use paths::{PathError, ResolvedPaths, ensure_directory};
pub use ports::{
    ChannelDownloadEmitter, DownloadEventEmitterPort, DownloadManagerConfig, DownloadManagerPort,
    NoopDownloadEmitter, NoopNotifier, NotificationPort, PublicStoragePort, RepositoryError,
    TaskChange, TaskChangeKind, TaskRepositoryPort,
};
