//! The generic PEG parse runtime (spec §4.D).
//!
//! This crate is linked two ways: `apy-testrunner` links it in-process to
//! interpret a compiled [`Grammar`] while running a grammar's embedded
//! tests, and `apy-codegen` renders a textual copy of its algorithm into
//! every generated parser. Nothing here depends on a specific grammar —
//! [`parse`]/[`parse_rule`] take the compiled [`Grammar`] as data.

#![warn(missing_docs)]

mod guard;
mod lexer;
mod parser;
mod sync;
pub mod value;

use apy_ast::model::Grammar;
use apy_ast::model::RuleId;

pub use guard::Bindings;
pub use guard::GuardEval;
pub use guard::GuardOutcome;
pub use guard::NoopGuardEval;
pub use lexer::CompiledToken;
pub use lexer::LexError;
pub use lexer::LexedToken;
pub use lexer::compile_tokens;
pub use lexer::lex;
pub use sync::SyncTokens;
pub use value::Value;

/// A recoverable error recorded during a parse (spec §4.D, "Output";
/// matches the generated parser API's `ParseError`).
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// A human-readable description, including any guard-raised message.
    pub message: String,
    /// 1-based line of the error.
    pub line: usize,
    /// 1-based column of the error.
    pub column: usize,
}

/// The outcome of a parse (spec §4.D, "Output").
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The resulting AST, or [`Value::Null`] if the start rule never
    /// matched at all.
    pub ast: Value,
    /// Every error recorded during the parse, in the order encountered.
    pub errors: Vec<ParseError>,
    /// The full token stream the parser consumed from (skip tokens
    /// omitted, per the lexer's contract).
    pub tokens: Vec<LexedToken>,
    /// `errors.is_empty()`.
    pub is_valid: bool,
}

/// Parses `input` against `grammar`, starting at its start rule.
///
/// `enable_recovery` controls whether panic-mode recovery runs on failure
/// (spec §6, `--no-recovery`); `guard_eval` supplies the guard-fragment
/// interpreter (spec §9).
pub fn parse(
    grammar: &Grammar,
    input: &str,
    guard_eval: &dyn GuardEval,
    enable_recovery: bool,
) -> Result<ParseResult, LexError> {
    let start = grammar
        .start_rule
        .expect("a checked grammar always has a start rule");
    parse_rule(grammar, input, start, guard_eval, enable_recovery)
}

/// Parses `input` against `grammar`, starting at an arbitrary rule (spec
/// §4.E: "emit a dispatch so callers can start at any rule").
pub fn parse_rule(
    grammar: &Grammar,
    input: &str,
    start: RuleId,
    guard_eval: &dyn GuardEval,
    enable_recovery: bool,
) -> Result<ParseResult, LexError> {
    let tokens = lexer::compile_tokens(grammar).map_err(|err| LexError {
        token: err.to_string(),
        line: 1,
        column: 1,
    })?;
    let lexed = lexer::lex(input, &tokens)?;
    let sync_tokens = sync::SyncTokens::derive(grammar);

    let mut state = parser::ParseState::new(&lexed, guard_eval, enable_recovery, sync_tokens);
    let outcome = state.match_rule(grammar, start, 0);

    let (ast, consumed_all) = match outcome {
        parser::MemoEntry::Success { value, end } => (value, end == lexed.len()),
        parser::MemoEntry::Failure => (Value::Null, false),
    };

    if !consumed_all && state.errors.is_empty() {
        let (line, column) = lexed
            .get(state.furthest_failure)
            .map(|t| (t.line, t.column))
            .unwrap_or_else(|| lexed.last().map(|t| (t.line, t.column + t.text.len())).unwrap_or((1, 1)));
        state.errors.push(ParseError {
            message: "unexpected end of input".to_string(),
            line,
            column,
        });
    }

    let is_valid = state.errors.is_empty();
    Ok(ParseResult {
        ast,
        errors: state.errors,
        tokens: lexed,
        is_valid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use apy_ast::lower;

    fn compile(src: &str) -> Grammar {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let mut lowered = lower(&parsed.tree);
        assert!(lowered.diagnostics.is_empty(), "{:?}", lowered.diagnostics);
        let mut grammar = lowered.grammars.remove(0);
        let report = apy_checker::check(&mut grammar);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        grammar
    }

    const CALC: &str = r#"
grammar Calc:
    tokens:
        NUMBER: [0-9]+
        PLUS: \+
        WS: skip \s+
    end

    start rule Expr:
        | l:Expr PLUS r:Term -> Add(l, r)
        | Term -> pass
    end

    rule Term:
        | n:NUMBER -> Num(int(n))
    end
end
"#;

    #[test]
    fn calculator_basics() {
        let grammar = compile(CALC);
        let result = parse(&grammar, "10 + 20", &NoopGuardEval, true).unwrap();
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.ast.to_string(), "Add(Num(10), Num(20))");
    }

    #[test]
    fn left_associativity() {
        let grammar = compile(CALC);
        let result = parse(&grammar, "1+2+3", &NoopGuardEval, true).unwrap();
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.ast.to_string(), "Add(Add(Num(1), Num(2)), Num(3))");
    }

    #[test]
    fn fail_expectation() {
        let grammar = compile(CALC);
        let result = parse(&grammar, "1+", &NoopGuardEval, true).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn memoization_runs_rule_body_once_per_position() {
        let grammar = compile(CALC);
        let tokens = compile_tokens(&grammar).unwrap();
        let lexed = lex("1+2+3", &tokens).unwrap();
        let sync_tokens = SyncTokens::derive(&grammar);
        let mut state = parser::ParseState::new(&lexed, &NoopGuardEval, true, sync_tokens);
        let start = grammar.start_rule.unwrap();
        let first = state.match_rule(&grammar, start, 0);
        let second = state.match_rule(&grammar, start, 0);
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }
}
