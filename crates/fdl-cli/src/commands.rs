//! Subcommands.

use clap::Subcommand;

use fdl_core::TaskStatus;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Download one or more URLs and follow them until they finish
    Get {
        /// URLs to download
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Resume paused or queued tasks
    Resume {
        /// Task ids to resume
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<i64>,
        /// Resume every paused or queued task
        #[arg(long)]
        all: bool,
    },

    /// Cancel a task and discard its partial data
    Cancel {
        /// Task id
        id: i64,
    },

    /// Delete a completed or cancelled task
    Delete {
        /// Task id
        id: i64,
    },

    /// List tasks
    List {
        /// Only show tasks with this status
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },

    /// Show resolved paths for all fdl directories
    Paths,
}

/// Strict status parser; unknown names are rejected.
fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    TaskStatus::ALL
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(raw.trim()))
        .ok_or_else(|| {
            let names: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
            format!("unknown status '{raw}' (expected one of: {})", names.join(", "))
        })
}
