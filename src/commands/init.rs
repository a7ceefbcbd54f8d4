//! Implementation of the `init` subcommand.
//!
//! Project scaffolding templates are explicitly out of scope (spec §1);
//! this subcommand exists and parses its flags so the external interface
//! contract (spec §6) holds, but refuses to run.

use std::path::PathBuf;

use clap::Parser;

use crate::ExitCode;

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The directory to scaffold a new grammar project in.
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Performs the `init` subcommand.
pub fn init(_args: Args) -> anyhow::Result<ExitCode> {
    tracing::error!("`init` is not part of the core pipeline and is not implemented");
    Ok(ExitCode::UsageError)
}
