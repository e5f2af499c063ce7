//! Download domain types, events, and errors.
//!
//! Pure data types for the download system. No networking or runtime
//! dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Task identity, status machine, persisted record, progress update
//! - `events` - Lifecycle events (`DownloadEvent`)
//! - `errors` - Error types for download operations
//! - `progress` - Percent/throughput arithmetic and formatting
//! - `projection` - Snapshot shape published to subscribers

pub mod errors;
pub mod events;
pub mod progress;
pub mod projection;
pub mod types;

pub use errors::{DownloadError, DownloadResult};
pub use events::DownloadEvent;
pub use progress::{
    IDLE_SPEED, bytes_per_second, format_bytes, format_speed, progress_percent,
};
pub use projection::ProjectionSnapshot;
pub use types::{
    DEFAULT_MIME_TYPE, DownloadTask, RemoteFileMeta, TaskId, TaskProgress, TaskStatus,
};
