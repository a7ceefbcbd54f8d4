//! Implementation of the `repl` subcommand.
//!
//! An interactive grammar REPL is explicitly out of scope (spec §1); this
//! subcommand exists and parses its flags so the external interface
//! contract (spec §6) holds, but refuses to run.

use std::path::PathBuf;

use clap::Parser;

use crate::ExitCode;

/// Arguments for the `repl` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The `.apy` grammar file to load into the REPL.
    pub grammar: Option<PathBuf>,
}

/// Performs the `repl` subcommand.
pub fn repl(_args: Args) -> anyhow::Result<ExitCode> {
    tracing::error!("`repl` is not part of the core pipeline and is not implemented");
    Ok(ExitCode::UsageError)
}
