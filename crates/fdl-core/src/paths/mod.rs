//! Path utilities for fdl data directories and user-configurable locations.
//!
//! - Database location
//! - Private partial-file cache
//! - Public downloads directory
//!
//! Returns `PathBuf` and `PathError`; no interactive I/O.

mod ensure;
mod error;
mod platform;
mod resolver;

pub use ensure::{ensure_directory, verify_writable};
pub use error::PathError;
pub use platform::{
    DATA_DIR_ENV, DOWNLOADS_DIR_ENV, data_root, default_downloads_dir, normalize_user_path,
};
pub use resolver::{DATABASE_FILE, PARTIAL_DIR, ResolvedPaths};
