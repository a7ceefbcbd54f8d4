//! The typed AST and compiled grammar model for `.apy` grammar files.
//!
//! This crate sits between the lossless concrete syntax tree built by
//! `apy-grammar` and the semantic checker in `apy-checker`: [`ast`] exposes
//! typed, read-only accessors over the tree, and [`lower::lower`] walks
//! them once into the immutable [`model::Grammar`] every later stage
//! (checker, test runner, runtime, emitter) operates on.

#![warn(missing_docs)]

pub mod ast;
mod display;
pub mod lower;
pub mod model;

pub use apy_grammar::Diagnostic;
pub use apy_grammar::Label;
pub use apy_grammar::Severity;
pub use lower::LowerOutput;
pub use lower::lower;
pub use model::Grammar;

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_source(src: &str) -> LowerOutput {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        lower(&parsed.tree)
    }

    #[test]
    fn lowers_calculator_grammar() {
        let src = r#"
grammar Calc:
    tokens:
        NUMBER: [0-9]+
        PLUS: \+
        WS: skip \s+
    end

    start rule Expr:
        | Expr PLUS Term -> Add(l, r)
        | Term -> pass
    end

    rule Term:
        | NUMBER -> Num(int(n))
    end
end
"#;
        let out = lower_source(src);
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.grammars.len(), 1);
        let g = &out.grammars[0];
        assert_eq!(g.name, "Calc");
        assert_eq!(g.tokens.len(), 3);
        assert_eq!(g.rules.len(), 2);
        assert!(g.rules[0].is_start);
    }

    #[test]
    fn round_trips_through_display() {
        let src = r#"
grammar Tiny:
    tokens:
        NUMBER: [0-9]+
    end

    start rule Expr:
        | NUMBER -> pass
    end
end
"#;
        let first = lower_source(src).grammars.remove(0);
        let rendered = first.to_string();
        let second = lower_source(&rendered).grammars.remove(0);
        assert_eq!(first.name, second.name);
        assert_eq!(first.tokens.len(), second.tokens.len());
        assert_eq!(first.rules.len(), second.rules.len());
    }
}
