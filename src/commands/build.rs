//! Implementation of the `build` subcommand (spec §6, §4.A–§4.E): drives
//! the full pipeline from `.apy` source to a standalone generated parser.

use std::path::PathBuf;

use clap::Parser;

use super::Common;
use super::pipeline;
use super::read_source;
use crate::ExitCode;

/// Arguments for the `build` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The common command line arguments.
    #[command(flatten)]
    pub common: Common,

    /// The output directory for the generated parser (spec §6: `-o DIR`).
    /// Defaults to the grammar file's own directory.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Skips running the grammar's embedded tests before emitting.
    #[arg(long, conflicts_with = "tests")]
    pub no_tests: bool,

    /// Runs only the grammar's embedded tests; no parser is emitted.
    #[arg(long, conflicts_with = "no_tests")]
    pub tests: bool,

    /// Omits panic-mode error recovery from the generated parser.
    #[arg(long)]
    pub no_recovery: bool,

    /// Runs the full pipeline (including tests) without writing output.
    #[arg(long)]
    pub dry_run: bool,
}

/// Performs the `build` subcommand.
pub fn build(args: Args) -> anyhow::Result<ExitCode> {
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

    if !args.no_tests {
        let suites = apy_testrunner::run_all(&grammar);
        let report = apy_testrunner::Report::new(suites);
        report.render(&mut std::io::stdout())?;

        if !report.all_passed() {
            // Fatal for `build` without `--no-tests` (spec §7): no code is
            // emitted when a test case fails.
            return Ok(ExitCode::TestsFailed);
        }
    }

    if args.tests {
        return Ok(ExitCode::Success);
    }

    let config = apy_codegen::Config {
        enable_recovery: !args.no_recovery,
    };
    let rendered = apy_codegen::emit(&grammar, config);
    let file_name = apy_codegen::output_file_name(&grammar.name);

    let destination = match &args.output {
        Some(dir) => dir.join(&file_name),
        None => args
            .common
            .grammar
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join(&file_name),
    };

    if args.dry_run {
        tracing::info!("dry run: would write {}", destination.display());
        return Ok(ExitCode::Success);
    }

    if let Some(dir) = destination.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .map_err(|e| anyhow::anyhow!("failed to create `{}`: {e}", dir.display()))?;
        }
    }
    std::fs::write(&destination, rendered)
        .map_err(|e| anyhow::anyhow!("failed to write `{}`: {e}", destination.display()))?;

    tracing::info!("wrote {}", destination.display());
    Ok(ExitCode::Success)
}
