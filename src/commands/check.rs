//! Implementation of the `check` subcommand (spec §6, §4.B).

use clap::Parser;

use super::Common;
use super::pipeline;
use super::read_source;
use crate::ExitCode;

/// Arguments for the `check` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The common command line arguments.
    #[command(flatten)]
    pub common: Common,
}

/// Performs the `check` subcommand: parses, lowers, and semantically
/// checks the grammar, reporting every diagnostic without emitting a
/// parser or running embedded tests.
pub fn check(args: Args) -> anyhow::Result<ExitCode> {
    let path = args.common.grammar.display().to_string();
    let report_mode = args.common.report_mode.unwrap_or_default();
    let no_color = args.common.no_color;

    let source = match read_source(&args.common.grammar) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("{e}");
            return Ok(ExitCode::IoError);
        }
    };

    match pipeline::compile(&path, &source, report_mode, no_color)? {
        Ok((grammar, report)) => {
            tracing::info!(
                "`{}` is valid: {} rule(s), {} token(s), {} warning(s)",
                grammar.name,
                grammar.rules.len(),
                grammar.tokens.len(),
                report.warnings.len(),
            );
            Ok(ExitCode::Success)
        }
        Err(code) => Ok(code),
    }
}
