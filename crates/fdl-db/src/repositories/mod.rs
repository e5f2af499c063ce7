//! Repository implementations backed by `SQLite`.

mod sqlite_task_repository;

pub use sqlite_task_repository::SqliteTaskRepository;
