//! Command-line front end for fdl.
//!
//! `main.rs` is the composition root; everything else is reachable from the
//! library so it can be unit tested.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used only by the binary's entry point
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod notifier;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use notifier::TerminalNotifier;
pub use parser::Cli;
