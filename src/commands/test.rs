//! Implementation of the `test` subcommand (spec §6, §4.C).

use clap::Parser;

use super::Common;
use super::pipeline;
use super::read_source;
use crate::ExitCode;

/// Arguments for the `test` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The common command line arguments.
    #[command(flatten)]
    pub common: Common,
}

/// Performs the `test` subcommand: checks the grammar, then runs every
/// embedded `test` block against the parse runtime and prints a pass/fail
/// summary. Exits non-zero on failure without refusing the grammar
/// (spec §7: "non-fatal for `test` — still exits non-zero").
pub fn test(args: Args) -> anyhow::Result<ExitCode> {
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

    let (grammar, _report) = match pipeline::compile(&path, &source, report_mode, no_color)? {
        Ok(pair) => pair,
        Err(code) => return Ok(code),
    };

    let suites = apy_testrunner::run_all(&grammar);
    let report = apy_testrunner::Report::new(suites);
    report.render(&mut std::io::stdout())?;

    if report.all_passed() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::TestsFailed)
    }
}
