//! The `.apy` grammar front-end: lexer, concrete syntax tree, and parser.
//!
//! This crate turns `.apy` source text into a lossless [`rowan`] tree plus a
//! set of syntax [`Diagnostic`]s. It knows nothing about grammar semantics
//! (duplicate rules, undefined references, left recursion, …) — that's
//! `apy-checker`'s job, working over the typed AST that `apy-ast` builds on
//! top of this crate's tree.

#![warn(missing_docs)]

mod diagnostic;
mod lexer;
mod parser;
mod syntax;

pub use diagnostic::Diagnostic;
pub use diagnostic::FileId;
pub use diagnostic::Label;
pub use diagnostic::Severity;
pub use diagnostic::Span;
pub use lexer::line_col;
pub use lexer::unescape_quoted;
pub use parser::ParseOutput;
pub use syntax::ApyLanguage;
pub use syntax::SyntaxElement;
pub use syntax::SyntaxKind;
pub use syntax::SyntaxNode;
pub use syntax::SyntaxToken;

/// Parses `.apy` source text into a concrete syntax tree.
///
/// Always returns a tree, even for malformed input: unparseable regions are
/// wrapped in [`SyntaxKind::ErrorNode`] and reported in the accompanying
/// diagnostics, so a single call can surface every syntax error in a file
/// rather than stopping at the first one.
pub fn parse(source: &str) -> ParseOutput {
    parser::parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_grammar() {
        let src = r#"
grammar Calc:
    tokens:
        NUMBER: [0-9]+
    end

    start rule expr:
        | NUMBER -> pass
    end
end
"#;
        let out = parse(src);
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.tree.kind(), SyntaxKind::SourceFile);
    }

    #[test]
    fn reports_syntax_error_and_recovers() {
        let src = r#"
grammar Broken:
    rule a:
        | NUMBER ->
    end

    rule b:
        | NUMBER -> pass
    end
end
"#;
        let out = parse(src);
        assert!(!out.diagnostics.is_empty());
    }
}
