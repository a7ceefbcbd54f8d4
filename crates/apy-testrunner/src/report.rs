//! Terminal summary rendering for a test run (spec §4.C: "The overall test
//! phase fails the build if any case fails").
//!
//! Grounded on `gauntlet::report`'s `Status`/pass-fail-percentage summary
//! (`crates/wdl-grammar/src/commands/gauntlet/report.rs`), retargeted from
//! corpus-repository parsing results to one grammar's embedded test suites.

use colored::Colorize as _;

use crate::runner::CaseResult;
use crate::runner::Status;
use crate::runner::SuiteResult;

/// A rendered report over every [`SuiteResult`] produced by [`crate::run_all`].
#[derive(Debug)]
pub struct Report {
    /// The per-suite results, in declaration order.
    pub suites: Vec<SuiteResult>,
}

impl Report {
    /// Wraps a set of suite results for summary rendering.
    pub fn new(suites: Vec<SuiteResult>) -> Self {
        Self { suites }
    }

    /// Total case count across every suite.
    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.cases.len()).sum()
    }

    /// Passed case count across every suite.
    pub fn passed(&self) -> usize {
        self.suites
            .iter()
            .flat_map(|s| &s.cases)
            .filter(|c| c.status.is_passed())
            .count()
    }

    /// Whether every case in every suite passed (spec §4.C: "fails the
    /// build if any case fails").
    pub fn all_passed(&self) -> bool {
        self.suites.iter().all(|s| s.all_passed())
    }

    /// Renders a human-readable summary to `out`, one line per case plus a
    /// trailing pass/fail percentage footer.
    pub fn render(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        for suite in &self.suites {
            writeln!(out, "{}", suite.name.bold().underline())?;
            for case in &suite.cases {
                render_case(out, case)?;
            }
        }

        let total = self.total();
        if total == 0 {
            writeln!(out, "{}", "no test cases found".yellow())?;
            return Ok(());
        }

        let passed = self.passed();
        writeln!(
            out,
            "Passed {passed}/{total} tests ({:.1}%)",
            (passed as f64 / total as f64) * 100.0
        )
    }
}

/// Renders one [`CaseResult`] line, colorized by outcome.
fn render_case(out: &mut dyn std::io::Write, case: &CaseResult) -> std::io::Result<()> {
    match &case.status {
        Status::Passed => writeln!(out, "  {} {}", "ok".green(), case.input),
        Status::Failed { reason } => {
            writeln!(out, "  {} {} — {}", "FAIL".red().bold(), case.input, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_pass_and_fail_counts() {
        let report = Report::new(vec![SuiteResult {
            name: "Basics".to_string(),
            cases: vec![
                CaseResult {
                    input: "1+1".to_string(),
                    status: Status::Passed,
                },
                CaseResult {
                    input: "1+".to_string(),
                    status: Status::Failed {
                        reason: "boom".to_string(),
                    },
                },
            ],
        }]);

        assert_eq!(report.total(), 2);
        assert_eq!(report.passed(), 1);
        assert!(!report.all_passed());

        let mut buf = Vec::new();
        report.render(&mut buf).unwrap();
        let rendered = String::from_utf8(buf).unwrap();
        assert!(rendered.contains("Passed 1/2 tests"));
    }
}
