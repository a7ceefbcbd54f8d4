//! Subcommands for the `apy` command line tool (spec §6).

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::InfoLevel;
use clap_verbosity_flag::Verbosity;

use crate::Mode;

pub mod build;
pub mod check;
pub mod fmt;
pub mod init;
mod pipeline;
pub mod repl;
pub mod test;

/// The `apy` command line arguments.
#[derive(Parser, Debug)]
#[command(name = "apy", author, version, about)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// The verbosity flags.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

/// The `apy` subcommands (spec §6: `init`, `build`, `check`, `test`, `fmt`,
/// `repl`).
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffolds a new grammar project.
    Init(init::Args),
    /// Compiles a grammar file into a standalone parser.
    Build(build::Args),
    /// Checks a grammar file for semantic errors and advisories.
    Check(check::Args),
    /// Runs a grammar's embedded test suites.
    Test(test::Args),
    /// Formats a grammar file.
    Fmt(fmt::Args),
    /// Starts an interactive grammar REPL.
    Repl(repl::Args),
}

/// Arguments shared by `build`, `check`, and `test` (spec §6's build flags,
/// minus the ones specific to `build` alone). Grounded on
/// `src/commands/check.rs`'s `Common`-args-struct pattern.
#[derive(Parser, Debug)]
pub struct Common {
    /// The `.apy` grammar file to compile.
    pub grammar: PathBuf,

    /// Disables color output.
    #[arg(long)]
    pub no_color: bool,

    /// The report mode.
    #[arg(short = 'm', long, value_name = "MODE")]
    pub report_mode: Option<Mode>,
}

/// Reads `path` as UTF-8 source text, mapping I/O failures to a message
/// suitable for reporting at exit code 3 (spec §6).
pub(crate) fn read_source(path: &std::path::Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read `{}`: {e}", path.display()))
}
