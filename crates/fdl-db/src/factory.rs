//! Composition utilities for wiring `SQLite` repositories.
//!
//! Construction only; no domain logic lives here.

use std::path::Path;
use std::sync::Arc;

use sqlx::SqlitePool;

use fdl_core::TaskRepositoryPort;

use crate::repositories::SqliteTaskRepository;
use crate::setup::setup_database;

/// Factory for creating repository instances with `SQLite` backends.
pub struct CoreFactory;

impl CoreFactory {
    /// Open (or create) the database at `db_path` with the full schema.
    pub async fn create_pool(db_path: &Path) -> anyhow::Result<SqlitePool> {
        setup_database(db_path).await
    }

    /// Create a task repository from a pool.
    pub fn task_repository(pool: SqlitePool) -> Arc<SqliteTaskRepository> {
        Arc::new(SqliteTaskRepository::new(pool))
    }

    /// Open the database and return the task store as a port.
    pub async fn open_task_store(db_path: &Path) -> anyhow::Result<Arc<dyn TaskRepositoryPort>> {
        let pool = Self::create_pool(db_path).await?;
        Ok(Self::task_repository(pool))
    }
}

/// Test database helper for integration tests.
///
/// Provides an in-memory `SQLite` database with the production schema.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    /// Create a new in-memory test database with full schema.
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Task repository over this database.
    pub fn task_repository(&self) -> Arc<SqliteTaskRepository> {
        CoreFactory::task_repository(self.pool.clone())
    }
}
