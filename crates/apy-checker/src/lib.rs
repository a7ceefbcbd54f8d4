//! The `.apy` semantic checker (spec §4.B).
//!
//! Runs, in order, over a freshly-lowered [`Grammar`]: duplicate detection,
//! start-rule resolution, reference resolution (with Levenshtein-nearest
//! suggestions for undefined names), direct-left-recursion marking, and the
//! advisory checks (naming, unused tokens, shadowing, unreachability,
//! orphan constructors, unnecessary capture). The grammar is annotated in
//! place — references are resolved, literals are promoted to synthetic
//! tokens, rules are flagged `left_recursive` — never renamed or
//! restructured, per spec §3's lifecycle rule.

#![warn(missing_docs)]

mod advisory;
mod left_recursion;
mod resolve;
pub mod visitor;

use std::collections::HashSet;

use apy_ast::Diagnostic;
use apy_ast::model::Grammar;
use apy_ast::model::RuleId;

pub use visitor::Rule;
pub use visitor::Validator;

/// The outcome of checking a [`Grammar`]: accumulated diagnostics and the
/// set of rules found to be directly left-recursive.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Fatal semantic errors (spec §4.B: duplicates, multiple start rules,
    /// undefined references). Non-empty means the grammar must not be
    /// emitted (spec §7).
    pub errors: Vec<Diagnostic>,
    /// Non-fatal advisory warnings (spec §4.B.5).
    pub warnings: Vec<Diagnostic>,
    /// Rules marked directly left-recursive by the seed-growing
    /// precondition pass (spec §4.B.4).
    pub left_recursive: HashSet<RuleId>,
}

impl CheckReport {
    /// Whether the grammar is valid and may proceed to the test runner and
    /// code emitter.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs every semantic-checker pass over `grammar`, mutating it in place
/// (annotating resolved references, synthetic tokens, and left-recursion
/// flags) and returning the accumulated [`CheckReport`].
pub fn check(grammar: &mut Grammar) -> CheckReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    resolve::resolve(grammar, &mut errors, &mut warnings);
    let left_recursive = left_recursion::mark_left_recursive(grammar);

    if errors.is_empty() {
        Validator::with_default_rules().run(grammar, &mut warnings);
    }

    CheckReport {
        errors,
        warnings,
        left_recursive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(src: &str) -> (Grammar, CheckReport) {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let mut lowered = apy_ast::lower(&parsed.tree);
        assert!(lowered.diagnostics.is_empty(), "{:?}", lowered.diagnostics);
        let mut grammar = lowered.grammars.remove(0);
        let report = check(&mut grammar);
        (grammar, report)
    }

    #[test]
    fn resolves_references_and_marks_left_recursion() {
        let src = r#"
grammar Calc:
    tokens:
        NUMBER: [0-9]+
        PLUS: \+
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
        let (grammar, report) = checked(src);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(grammar.rules[0].left_recursive);
        assert!(!grammar.rules[1].left_recursive);
    }

    #[test]
    fn reports_undefined_reference_with_suggestion() {
        let src = r#"
grammar Bad:
    start rule Stmt:
        | Foo -> pass
    end

    rule Foe:
        | "x" -> pass
    end
end
"#;
        let (_grammar, report) = checked(src);
        assert_eq!(report.errors.len(), 1);
        let msg = report.errors[0].message.clone();
        assert!(msg.contains("Foo"), "{msg}");
        assert!(msg.contains("Foe"), "{msg}");
    }

    #[test]
    fn promotes_inline_literals_to_synthetic_tokens() {
        let src = r#"
grammar Kw:
    tokens:
        NUMBER: [0-9]+
    end

    start rule Stmt:
        | "if" Stmt "then" Stmt -> If(c, b)
    end
end
"#;
        let (grammar, report) = checked(src);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(grammar.tokens.iter().any(|t| t.synthetic_literal.as_deref() == Some("if")));
        assert!(grammar.tokens.iter().any(|t| t.synthetic_literal.as_deref() == Some("then")));
    }

    #[test]
    fn reports_invalid_token_regex() {
        let src = r#"
grammar Bad:
    tokens:
        BROKEN: [unterminated
    end

    start rule Stmt:
        | BROKEN -> pass
    end
end
"#;
        let (_grammar, report) = checked(src);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|d| d.message.contains("BROKEN")));
    }

    #[test]
    fn detects_duplicate_rule_names() {
        let src = r#"
grammar Dup:
    start rule A:
        | "x" -> pass
    end

    rule A:
        | "y" -> pass
    end
end
"#;
        let (_grammar, report) = checked(src);
        assert!(report.errors.iter().any(|d| d.message.contains("duplicate rule")));
    }
}
