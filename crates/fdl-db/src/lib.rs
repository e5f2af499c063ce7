//! `SQLite` task store for fdl.
//!
//! Implements [`fdl_core::TaskRepositoryPort`] over `sqlx`, plus the schema
//! setup and composition helpers adapters use to obtain it.
#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
pub mod setup;

pub use factory::CoreFactory;

#[cfg(any(test, feature = "test-utils"))]
pub use factory::TestDb;

pub use repositories::SqliteTaskRepository;

pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;

// libsqlite3-sys is linked only for its bundled build
use libsqlite3_sys as _;
