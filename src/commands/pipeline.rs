//! The shared front-end-through-checker driver used by `build`, `check`,
//! and `test` (spec §4.A–§4.B): parse, lower, and semantically check a
//! `.apy` source file, reporting every diagnostic along the way.

use apy_ast::model::Grammar;
use apy_checker::CheckReport;

use crate::ExitCode;
use crate::Mode;
use crate::emit_diagnostics;

/// Parses, lowers, and checks `source`, emitting diagnostics as they're
/// produced at each stage. Returns the checked grammar and its report on
/// success; returns the exit code to fail with if a stage was fatal
/// (spec §7: syntax/semantic errors are fatal, advisories are not).
pub(crate) fn compile(
    path: &str,
    source: &str,
    report_mode: Mode,
    no_color: bool,
) -> anyhow::Result<Result<(Grammar, CheckReport), ExitCode>> {
    let parsed = apy_grammar::parse(source);
    if !parsed.diagnostics.is_empty() {
        emit_diagnostics(path, source, &parsed.diagnostics, report_mode, no_color)?;
        if parsed.diagnostics.iter().any(is_error) {
            return Ok(Err(ExitCode::GrammarErrors));
        }
    }

    let lowered = apy_ast::lower(&parsed.tree);
    if !lowered.diagnostics.is_empty() {
        emit_diagnostics(path, source, &lowered.diagnostics, report_mode, no_color)?;
        if lowered.diagnostics.iter().any(is_error) {
            return Ok(Err(ExitCode::GrammarErrors));
        }
    }

    let mut grammars = lowered.grammars.into_iter();
    let Some(mut grammar) = grammars.next() else {
        anyhow::bail!("`{path}` does not define a grammar");
    };
    if grammars.next().is_some() {
        tracing::warn!(
            "`{path}` defines more than one grammar; operating on `{}` only",
            grammar.name
        );
    }

    let report = apy_checker::check(&mut grammar);
    if !report.errors.is_empty() {
        emit_diagnostics(path, source, &report.errors, report_mode, no_color)?;
        return Ok(Err(ExitCode::GrammarErrors));
    }
    if !report.warnings.is_empty() {
        emit_diagnostics(path, source, &report.warnings, report_mode, no_color)?;
    }

    Ok(Ok((grammar, report)))
}

/// Whether a diagnostic is fatal (spec §7: `Severity::Error` carries both
/// `SyntaxError` and `SemanticError`; everything else is advisory).
fn is_error(diagnostic: &apy_grammar::Diagnostic) -> bool {
    diagnostic.severity == apy_grammar::Severity::Error
}
