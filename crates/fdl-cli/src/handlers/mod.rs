//! Command handlers.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that call the download manager and format output
//!
//! Handlers should NOT contain transfer logic or write to the task store.

pub mod cancel;
pub mod delete;
pub mod get;
pub mod list;
pub mod monitor;
pub mod paths;
pub mod resume;
