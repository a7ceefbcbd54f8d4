//! The embedded test driver (spec §4.C).
//!
//! Before code is emitted, a grammar's `test` blocks are run against an
//! in-process interpretation of the compiled [`apy_ast::model::Grammar`]
//! (`apy-runtime`, linked in-process rather than generated-and-compiled).
//! `Success`/`Fail`/`Yields(pattern)` expectations are checked with
//! wildcard-tolerant structural AST matching; [`report::Report`] renders a
//! pass/fail/percentage summary in the style of `gauntlet::report`.

#![warn(missing_docs)]

mod mini_eval;
pub mod report;
pub mod runner;

pub use mini_eval::MiniGuardEval;
pub use report::Report;
pub use runner::CaseResult;
pub use runner::Status;
pub use runner::SuiteResult;
pub use runner::run_all;
pub use runner::run_suite;
