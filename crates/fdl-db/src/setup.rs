//! Database setup and initialization.
//!
//! Entry points call [`setup_database`] with the resolved database path;
//! tests use [`setup_test_database`].

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

/// Sets up the `SQLite` database connection and ensures the schema exists.
///
/// Creates the parent directory and the database file when missing, enables
/// WAL so progress writes from concurrent transfers do not block readers.
///
/// # Example
///
/// ```rust,no_run
/// use fdl_db::setup_database;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = setup_database(Path::new("/path/to/fdl.db")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await?;

    create_schema(&pool).await?;
    tracing::debug!(path = %db_path.display(), "task database ready");

    Ok(pool)
}

/// Sets up an in-memory `SQLite` database for testing.
///
/// Every connection to `sqlite::memory:` opens a distinct database, so the
/// pool is pinned to one long-lived connection.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Creates the complete database schema.
///
/// Safe to call multiple times; every statement uses IF NOT EXISTS.
pub(crate) async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS download_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT NOT NULL,
            url TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            total_bytes INTEGER NOT NULL DEFAULT 0,
            downloaded_bytes INTEGER NOT NULL DEFAULT 0,
            progress REAL NOT NULL DEFAULT 0,
            speed TEXT NOT NULL DEFAULT '0 B/s',
            status TEXT NOT NULL DEFAULT 'paused',
            message TEXT NOT NULL DEFAULT '',
            supports_resume INTEGER NOT NULL DEFAULT 0,
            is_loading INTEGER NOT NULL DEFAULT 0,
            queued_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    // Dedup key: one task per (file name, MIME type)
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_download_tasks_file ON download_tasks(file_name, mime_type)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_download_tasks_status ON download_tasks(status, queued_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
