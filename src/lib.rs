//! A PEG parser generator: compiles `.apy` grammar files into standalone
//! parser source.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

use std::io::IsTerminal as _;

use apy_grammar::Diagnostic;
use clap::ValueEnum;
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::Config;
use codespan_reporting::term::DisplayStyle;
use codespan_reporting::term::emit;
use codespan_reporting::term::termcolor::ColorChoice;
use codespan_reporting::term::termcolor::StandardStream;

pub mod commands;

/// The process exit codes the CLI's contract promises (spec §6): `0`
/// success, `1` tests failed, `2` grammar errors, `3` I/O error, `4` usage
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// The command completed successfully.
    Success,
    /// `build`/`test` ran but one or more embedded test cases failed.
    TestsFailed,
    /// The grammar failed to parse or check (a syntax or semantic error).
    GrammarErrors,
    /// Reading the source file or writing generated output failed.
    IoError,
    /// The command line arguments were invalid, or a not-yet-implemented
    /// subcommand was invoked.
    UsageError,
}

impl ExitCode {
    /// The raw process exit status this code maps to.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::TestsFailed => 1,
            ExitCode::GrammarErrors => 2,
            ExitCode::IoError => 3,
            ExitCode::UsageError => 4,
        }
    }
}

/// The diagnostic mode to use for reporting diagnostics.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum Mode {
    /// Prints diagnostics as multiple lines.
    #[default]
    Full,

    /// Prints diagnostics as one line.
    OneLine,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Full => write!(f, "full"),
            Mode::OneLine => write!(f, "one-line"),
        }
    }
}

/// Gets the display config to use for reporting diagnostics.
fn get_display_config(report_mode: Mode, no_color: bool) -> (Config, StandardStream) {
    let display_style = match report_mode {
        Mode::Full => DisplayStyle::Rich,
        Mode::OneLine => DisplayStyle::Short,
    };

    let config = Config {
        display_style,
        ..Default::default()
    };

    let color_choice = if no_color {
        ColorChoice::Never
    } else if std::io::stderr().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };

    let writer = StandardStream::stderr(color_choice);

    (config, writer)
}

/// Emits a batch of diagnostics against a single named source file.
///
/// Every compiler stage (front-end, lowering, checker) reports through the
/// same `codespan_reporting`-based [`Diagnostic`] currency, so one function
/// handles all of them regardless of which stage produced them.
pub fn emit_diagnostics<'a>(
    path: &str,
    source: &str,
    diagnostics: impl IntoIterator<Item = &'a Diagnostic>,
    report_mode: Mode,
    no_color: bool,
) -> anyhow::Result<()> {
    let file = SimpleFile::new(path, source);
    let (config, stream) = get_display_config(report_mode, no_color);
    let mut stream = stream.lock();

    for diagnostic in diagnostics {
        emit(&mut stream, &config, &file, diagnostic)?;
    }

    Ok(())
}
