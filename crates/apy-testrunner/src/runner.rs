//! Executes a grammar's embedded [`TestSuite`]s against the parse runtime
//! (spec §4.C).
//!
//! Each [`TestCase`] is run through [`apy_runtime::parse_rule`], starting at
//! the suite's `target_rule` (or the grammar's start rule if unset), and
//! compared against its [`Expectation`].

use apy_ast::model::Expectation;
use apy_ast::model::Grammar;
use apy_ast::model::TestCase;
use apy_ast::model::TestSuite;
use apy_ast::model::YieldsPattern;
use apy_runtime::GuardEval;
use apy_runtime::ParseResult;
use apy_runtime::Value;

use crate::mini_eval::MiniGuardEval;

/// The outcome of running a single [`TestCase`].
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// The case met its expectation.
    Passed,
    /// The case did not meet its expectation; `reason` explains how.
    Failed {
        /// A human-readable description of the mismatch.
        reason: String,
    },
}

impl Status {
    /// Whether this case passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, Status::Passed)
    }
}

/// One [`TestCase`]'s result, paired with the case's input for reporting.
#[derive(Debug, Clone)]
pub struct CaseResult {
    /// The case's input text, echoed for reporting.
    pub input: String,
    /// The outcome of comparing the parse against the case's expectation.
    pub status: Status,
}

/// One [`TestSuite`]'s results.
#[derive(Debug, Clone)]
pub struct SuiteResult {
    /// The suite's name.
    pub name: String,
    /// The per-case outcomes, in declaration order.
    pub cases: Vec<CaseResult>,
}

impl SuiteResult {
    /// Whether every case in this suite passed.
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|c| c.status.is_passed())
    }
}

/// Runs every test suite embedded in `grammar`, using the in-process
/// [`MiniGuardEval`] to exercise any `check` guards a test's rule depends
/// on (spec §9, "Dynamic host-language fragments").
pub fn run_all(grammar: &Grammar) -> Vec<SuiteResult> {
    let guard = MiniGuardEval;
    grammar
        .test_suites
        .iter()
        .map(|suite| run_suite(grammar, suite, &guard))
        .collect()
}

/// Runs one [`TestSuite`]'s cases against `grammar`.
pub fn run_suite(grammar: &Grammar, suite: &TestSuite, guard: &dyn GuardEval) -> SuiteResult {
    let target = suite
        .target_rule
        .as_deref()
        .and_then(|name| grammar.find_rule(name))
        .or(grammar.start_rule);

    let cases = suite
        .cases
        .iter()
        .map(|case| run_case(grammar, target, case, guard))
        .collect();

    SuiteResult {
        name: suite.name.clone(),
        cases,
    }
}

/// Runs a single [`TestCase`], starting the parse at `target` (falling back
/// to a synthetic failure if the suite has no resolvable target rule).
fn run_case(
    grammar: &Grammar,
    target: Option<apy_ast::model::RuleId>,
    case: &TestCase,
    guard: &dyn GuardEval,
) -> CaseResult {
    let Some(target) = target else {
        return CaseResult {
            input: case.input.clone(),
            status: Status::Failed {
                reason: "test suite has no resolvable target rule".to_string(),
            },
        };
    };

    let result = apy_runtime::parse_rule(grammar, &case.input, target, guard, true);

    let status = match result {
        Err(err) => Status::Failed {
            reason: format!("lex error: {err}"),
        },
        Ok(parsed) => check_expectation(&parsed, &case.expectation),
    };

    CaseResult {
        input: case.input.clone(),
        status,
    }
}

/// Compares a [`ParseResult`] against a [`TestCase`]'s [`Expectation`]
/// (spec §4.C).
fn check_expectation(parsed: &ParseResult, expectation: &Expectation) -> Status {
    let consumed_all = parsed.is_valid;
    match expectation {
        Expectation::Success => {
            if consumed_all {
                Status::Passed
            } else {
                Status::Failed {
                    reason: format!("expected success, got errors: {:?}", parsed.errors),
                }
            }
        }
        Expectation::Fail => {
            if consumed_all {
                Status::Failed {
                    reason: "expected failure, but the parse succeeded".to_string(),
                }
            } else {
                Status::Passed
            }
        }
        Expectation::Yields(pattern) => {
            if !consumed_all {
                return Status::Failed {
                    reason: format!("expected a match, got errors: {:?}", parsed.errors),
                };
            }
            if matches_pattern(&parsed.ast, pattern) {
                Status::Passed
            } else {
                Status::Failed {
                    reason: format!("ast `{}` did not match expected pattern", parsed.ast),
                }
            }
        }
    }
}

/// Structurally matches `value` against `pattern` (spec §4.C, "Yields"):
/// constructor-name equality, argument-count equality except where the
/// pattern's trailing argument is a wildcard, and recursive matching of
/// leaves.
fn matches_pattern(value: &Value, pattern: &YieldsPattern) -> bool {
    match pattern {
        YieldsPattern::Wildcard => true,
        YieldsPattern::Int(expected) => matches!(value, Value::Int(n) if n == expected)
            || matches!(value, Value::Str(s) if s.trim().parse::<i64>().ok().as_ref() == Some(expected)),
        YieldsPattern::Str(expected) => match value {
            Value::Str(s) => s == expected,
            other => &other.to_string() == expected,
        },
        YieldsPattern::Constructor { name, args } => {
            let Value::Node { tag, args: actual } = value else {
                return false;
            };
            if tag != name {
                return false;
            }
            match args.last() {
                Some(YieldsPattern::Wildcard) => {
                    let fixed = &args[..args.len() - 1];
                    if actual.len() < fixed.len() {
                        return false;
                    }
                    fixed.iter().zip(actual.iter()).all(|(p, v)| matches_pattern(v, p))
                }
                _ => {
                    actual.len() == args.len()
                        && actual.iter().zip(args.iter()).all(|(v, p)| matches_pattern(v, p))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> Grammar {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let mut lowered = apy_ast::lower(&parsed.tree);
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

    test Basics:
        "10 + 20" => Yields(Add(Num(10), Num(20)))
        "1+2+3" => Yields(Add(Add(Num(1), Num(2)), Num(3)))
        "1+" => Fail
        "7" => Success
    end
end
"#;

    #[test]
    fn runs_calculator_test_suite() {
        let grammar = compile(CALC);
        let results = run_all(&grammar);
        assert_eq!(results.len(), 1);
        let suite = &results[0];
        assert_eq!(suite.name, "Basics");
        assert!(suite.all_passed(), "{:?}", suite.cases);
    }

    #[test]
    fn wildcard_tolerates_extra_arguments() {
        let grammar = compile(CALC);
        let suite = &grammar.test_suites[0];
        let guard = MiniGuardEval;
        let mut case = suite.cases[0].clone();
        case.expectation = Expectation::Yields(YieldsPattern::Constructor {
            name: "Add".to_string(),
            args: vec![YieldsPattern::Wildcard],
        });
        let result = run_case(&grammar, grammar.start_rule, &case, &guard);
        assert!(result.status.is_passed(), "{:?}", result.status);
    }

    #[test]
    fn detects_failed_expectation_mismatch() {
        let grammar = compile(CALC);
        let guard = MiniGuardEval;
        let mut case = grammar.test_suites[0].cases[0].clone();
        case.expectation = Expectation::Fail;
        let result = run_case(&grammar, grammar.start_rule, &case, &guard);
        assert!(!result.status.is_passed());
    }
}
