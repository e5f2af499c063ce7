//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface definition for the resumable downloader.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "fdl")]
#[command(about = "Resumable HTTP downloads with a persistent task list")]
#[command(version)]
pub struct Cli {
    /// Directory holding the task database and partial files
    #[arg(long = "data-dir", env = "FDL_DATA_DIR", global = true)]
    pub data_dir: Option<String>,

    /// Directory completed files are moved into
    #[arg(long = "downloads-dir", env = "FDL_DOWNLOADS_DIR", global = true)]
    pub downloads_dir: Option<String>,

    /// Maximum number of simultaneous transfers
    #[arg(long = "max-concurrent", env = "FDL_MAX_CONCURRENT", global = true)]
    pub max_concurrent: Option<u32>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "fdl",
            "--verbose",
            "--data-dir",
            "/tmp/fdl",
            "list",
            "--max-concurrent",
            "2",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/fdl"));
        assert_eq!(cli.max_concurrent, Some(2));
        assert!(matches!(cli.command, Some(Commands::List { status: None })));
    }
}
