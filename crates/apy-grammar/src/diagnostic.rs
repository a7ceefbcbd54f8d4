//! Shared diagnostic types.
//!
//! Every compiler stage (front-end, checker, test runner, emitter) reports
//! through the same [`codespan_reporting`]-based currency, re-exported from
//! here so downstream crates (`apy-ast`, `apy-checker`, …) don't each depend
//! on `codespan-reporting` with a different `FileId` type.

use std::ops::Range;

/// This crate only ever compiles a single grammar file at a time, so file
/// identity is trivial: there is exactly one file, `()`.
pub type FileId = ();

/// A diagnostic, as reported by any stage of the pipeline.
pub type Diagnostic = codespan_reporting::diagnostic::Diagnostic<FileId>;
/// A labeled span within a diagnostic.
pub type Label = codespan_reporting::diagnostic::Label<FileId>;
/// The severity of a diagnostic.
pub type Severity = codespan_reporting::diagnostic::Severity;

/// A byte-offset span in the source text.
pub type Span = Range<usize>;
