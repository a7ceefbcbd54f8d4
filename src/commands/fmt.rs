//! Implementation of the `fmt` subcommand.
//!
//! A grammar-file formatter is explicitly out of scope (spec §1's "Editor
//! integration... formatter"); this subcommand exists and parses its flags
//! so the external interface contract (spec §6) holds, but refuses to run.

use std::path::PathBuf;

use clap::Parser;

use crate::ExitCode;

/// Arguments for the `fmt` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The `.apy` grammar file to format.
    pub grammar: PathBuf,

    /// Checks formatting without writing changes.
    #[arg(long)]
    pub check: bool,
}

/// Performs the `fmt` subcommand.
pub fn fmt(_args: Args) -> anyhow::Result<ExitCode> {
    tracing::error!("`fmt` is not part of the core pipeline and is not implemented");
    Ok(ExitCode::UsageError)
}
