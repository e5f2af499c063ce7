//! CLI entry point - the composition root.
//!
//! Parses arguments, installs logging, bootstraps the context, and
//! dispatches to handlers.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use fdl_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

const VERBOSE_FILTER: &str = "warn,fdl_core=debug,fdl_db=debug,fdl_download=debug,fdl_cli=debug";

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::from_cli(&cli)?;
    if matches!(command, Commands::Paths) {
        handlers::paths::execute(&config.paths);
        return Ok(());
    }

    let ctx = bootstrap(config).await?;

    match command {
        Commands::Get { urls } => handlers::get::execute(&ctx, urls).await,
        Commands::Resume { ids, all } => handlers::resume::execute(&ctx, ids, *all).await,
        Commands::Cancel { id } => handlers::cancel::execute(&ctx, *id).await,
        Commands::Delete { id } => handlers::delete::execute(&ctx, *id).await,
        Commands::List { status } => handlers::list::execute(&ctx, *status).await,
        Commands::Paths => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads `env` defaults
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(CliError::exit_code_for(&e))
        }
    }
}
