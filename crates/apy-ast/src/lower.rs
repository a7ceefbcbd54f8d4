//! Lowers the `apy-grammar` concrete syntax tree into the immutable
//! [`crate::model::Grammar`] data model (spec §3).
//!
//! This pass is purely structural: it builds `Reference`/`Action`/`Term`
//! values from the tree without resolving names, detecting duplicates, or
//! marking left recursion — those are `apy-checker`'s job, run afterward
//! over the `Grammar` this module produces. The one thing lowering does
//! reject outright is a malformed literal (integer/string) it cannot parse,
//! since the checker has no tree position left to blame by that point.

use apy_grammar::Diagnostic;
use apy_grammar::Label;
use apy_grammar::SyntaxKind;
use apy_grammar::SyntaxNode;
use apy_grammar::unescape_quoted;

use crate::ast::AstNode;
use crate::ast::GrammarDef;
use crate::ast::SourceFile;
use crate::model::Action;
use crate::model::ActionArg;
use crate::model::CheckGuard;
use crate::model::Expectation;
use crate::model::Expression;
use crate::model::Grammar;
use crate::model::Quantifier;
use crate::model::Reference;
use crate::model::Rule;
use crate::model::TestCase;
use crate::model::TestSuite;
use crate::model::Term;
use crate::model::Token;
use crate::model::YieldsPattern;

/// The result of lowering a source file: one [`Grammar`] per top-level
/// `grammar ... end` block (spec §4.A allows more than one per file), plus
/// any diagnostics raised along the way.
#[derive(Debug)]
pub struct LowerOutput {
    /// The lowered grammars, in declaration order.
    pub grammars: Vec<Grammar>,
    /// Diagnostics raised while lowering (currently: malformed literals
    /// only; everything else is the checker's responsibility).
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts a rowan byte range into the `Range<usize>` `codespan-reporting`
/// expects.
fn text_range_to_span(range: rowan::TextRange) -> std::ops::Range<usize> {
    usize::from(range.start())..usize::from(range.end())
}

/// Lowers a parsed `.apy` syntax tree into its [`Grammar`] model(s).
pub fn lower(tree: &SyntaxNode) -> LowerOutput {
    let mut diagnostics = Vec::new();
    let grammars = SourceFile::cast(tree.clone())
        .map(|sf| {
            sf.grammars()
                .map(|g| lower_grammar(&g, &mut diagnostics))
                .collect()
        })
        .unwrap_or_default();
    LowerOutput {
        grammars,
        diagnostics,
    }
}

fn lower_grammar(def: &GrammarDef, diagnostics: &mut Vec<Diagnostic>) -> Grammar {
    let name = def.name().unwrap_or_default();

    let mut tokens = Vec::new();
    if let Some(block) = def.tokens_block() {
        for token_def in block.tokens() {
            tokens.push(Token {
                name: token_def.name().unwrap_or_default(),
                pattern: token_def.pattern().unwrap_or_default(),
                skip: token_def.is_skip(),
                synthetic_literal: None,
            });
        }
    }

    let mut rules = Vec::new();
    let mut explicit_start: Option<usize> = None;
    for rule_def in def.rules() {
        if rule_def.is_start() && explicit_start.is_none() {
            explicit_start = Some(rules.len());
        }
        rules.push(Rule {
            name: rule_def.name().unwrap_or_default(),
            is_start: rule_def.is_start(),
            expressions: rule_def
                .alts()
                .map(|alt| lower_expr_alt(&alt, diagnostics))
                .collect(),
            left_recursive: false,
        });
    }

    let start_rule = explicit_start
        .or(if rules.is_empty() { None } else { Some(0) })
        .map(|i| crate::model::RuleId(i as u32));

    let test_suites = def
        .test_blocks()
        .map(|block| lower_test_block(&block, diagnostics))
        .collect();

    Grammar {
        name,
        tokens,
        rules,
        test_suites,
        start_rule,
    }
}

fn lower_expr_alt(
    alt: &crate::ast::ExprAlt,
    diagnostics: &mut Vec<Diagnostic>,
) -> Expression {
    let terms = alt.terms().map(|t| lower_term(&t)).collect();
    let action = alt
        .action()
        .map(|a| lower_action(&a, diagnostics))
        .unwrap_or(Action::Pass);
    let guard = alt.guard().map(|g| CheckGuard {
        condition: g.condition().unwrap_or_default(),
        then_branch: g.then_branch().unwrap_or_default(),
        else_branch: g.else_branch(),
    });
    Expression {
        terms,
        action,
        guard,
    }
}

fn lower_term(term: &crate::ast::TermNode) -> Term {
    let base = match term.base_token() {
        Some(tok) if tok.kind() == SyntaxKind::String => Term::Reference(Reference::Literal {
            text: unescape_quoted(tok.text()),
            token: None,
        }),
        Some(tok) => Term::Reference(Reference::Named {
            name: tok.text().to_string(),
            resolved: None,
        }),
        None => Term::Reference(Reference::Named {
            name: String::new(),
            resolved: None,
        }),
    };

    let base = if let Some(name) = term.binding_name() {
        Term::Binding {
            name,
            base: Box::new(base),
        }
    } else {
        base
    };

    if let Some(q) = term.quantifier_token() {
        let quantifier = match q.text() {
            "?" => Quantifier::Optional,
            "*" => Quantifier::ZeroOrMore,
            _ => Quantifier::OneOrMore,
        };
        Term::Repetition {
            base: Box::new(base),
            quantifier,
        }
    } else {
        base
    }
}

fn lower_action(action: &crate::ast::ActionNode, diagnostics: &mut Vec<Diagnostic>) -> Action {
    if action.is_pass() {
        return Action::Pass;
    }
    let Some(ctor) = action.constructor() else {
        return Action::Pass;
    };
    let name = ctor.name().unwrap_or_default();
    let args = ctor
        .arg_list()
        .map(|list| lower_args(&list, diagnostics))
        .unwrap_or_default();
    Action::Constructor { name, args }
}

fn lower_args(list: &crate::ast::ArgListNode, diagnostics: &mut Vec<Diagnostic>) -> Vec<ActionArg> {
    let tokens = list.raw_tokens();
    let mut args = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        match tok.kind() {
            SyntaxKind::Comma => {
                i += 1;
            }
            SyntaxKind::Ident => {
                if tokens.get(i + 1).is_some_and(|t| t.kind() == SyntaxKind::LParen) {
                    let func = tok.text().to_string();
                    let arg = tokens
                        .get(i + 2)
                        .filter(|t| t.kind() == SyntaxKind::Ident)
                        .map(|t| t.text().to_string())
                        .unwrap_or_default();
                    args.push(ActionArg::Call { func, arg });
                    i += 4; // ident '(' ident ')'
                } else {
                    args.push(ActionArg::Ident(tok.text().to_string()));
                    i += 1;
                }
            }
            SyntaxKind::Int => {
                match tok.text().parse::<i64>() {
                    Ok(n) => args.push(ActionArg::Int(n)),
                    Err(_) => diagnostics.push(
                        Diagnostic::error()
                            .with_message(format!("malformed integer literal `{}`", tok.text()))
                            .with_labels(vec![Label::primary((), text_range_to_span(tok.text_range()))]),
                    ),
                }
                i += 1;
            }
            SyntaxKind::String => {
                args.push(ActionArg::Str(unescape_quoted(tok.text())));
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }
    args
}

fn lower_test_block(
    block: &crate::ast::TestBlockNode,
    diagnostics: &mut Vec<Diagnostic>,
) -> TestSuite {
    let names = block.names();
    let name = names.first().cloned().unwrap_or_default();
    let target_rule = names.get(1).cloned();
    let cases = block
        .cases()
        .filter_map(|c| lower_test_case(&c, diagnostics))
        .collect();
    TestSuite {
        name,
        target_rule,
        cases,
    }
}

fn lower_test_case(
    case: &crate::ast::TestCaseNode,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<TestCase> {
    let raw_input = case.input()?;
    let input = unescape_quoted(&raw_input);
    let expectation = match case.expectation_ident().as_deref() {
        Some("Success") => Expectation::Success,
        Some("Fail") => Expectation::Fail,
        Some("Yields") => {
            let pattern = case
                .yields_pattern()
                .map(|p| lower_yields_pattern(&p))
                .unwrap_or(YieldsPattern::Wildcard);
            Expectation::Yields(pattern)
        }
        Some(other) => {
            diagnostics.push(
                Diagnostic::error()
                    .with_message(format!("unknown test expectation `{other}`"))
                    .with_labels(vec![Label::primary(
                        (),
                        text_range_to_span(case.syntax().text_range()),
                    )]),
            );
            Expectation::Fail
        }
        None => Expectation::Fail,
    };
    Some(TestCase { input, expectation })
}

fn lower_yields_pattern(node: &crate::ast::YieldsPatternNode) -> YieldsPattern {
    // Direct children in document order, tokens and nested `YieldsPattern`
    // nodes interleaved exactly as the parser produced them — a nested
    // `Name(args)` argument is its own child node, not a flattened run of
    // tokens, so nodes and tokens must be walked together rather than
    // collected into two separate lists (which loses the positional
    // correspondence between a `(` and the nested argument it opens).
    let mut elements = node.syntax().children_with_tokens().filter(|el| match el {
        rowan::NodeOrToken::Token(t) => !t.kind().is_trivia(),
        rowan::NodeOrToken::Node(_) => true,
    });

    let Some(first) = elements.next() else {
        return YieldsPattern::Wildcard;
    };

    let name_tok = match &first {
        rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::DotDotDot => {
            return YieldsPattern::Wildcard;
        }
        rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::Int => {
            return YieldsPattern::Int(t.text().parse().unwrap_or(0));
        }
        rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::String => {
            return YieldsPattern::Str(unescape_quoted(t.text()));
        }
        rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::Ident => t.clone(),
        _ => return YieldsPattern::Wildcard,
    };

    let mut args = Vec::new();
    for el in elements {
        match el {
            rowan::NodeOrToken::Node(child) => {
                if let Some(nested_node) = crate::ast::YieldsPatternNode::cast(child) {
                    args.push(lower_yields_pattern(&nested_node));
                }
            }
            rowan::NodeOrToken::Token(tok) => match tok.kind() {
                SyntaxKind::Int => args.push(YieldsPattern::Int(tok.text().parse().unwrap_or(0))),
                SyntaxKind::String => args.push(YieldsPattern::Str(unescape_quoted(tok.text()))),
                SyntaxKind::DotDotDot => args.push(YieldsPattern::Wildcard),
                _ => {}
            },
        }
    }

    YieldsPattern::Constructor {
        name: name_tok.text().to_string(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
        "x" => Yields(Add(..., Num(1)))
    end
end
"#;

    fn first_grammar(src: &str) -> Grammar {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let mut lowered = lower(&parsed.tree);
        assert!(lowered.diagnostics.is_empty(), "{:?}", lowered.diagnostics);
        lowered.grammars.remove(0)
    }

    #[test]
    fn nested_constructor_yields_patterns_lower_recursively() {
        let grammar = first_grammar(CALC);
        let suite = &grammar.test_suites[0];

        let Expectation::Yields(pattern) = &suite.cases[0].expectation else {
            panic!("expected a Yields expectation");
        };
        match pattern {
            YieldsPattern::Constructor { name, args } => {
                assert_eq!(name, "Add");
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0], YieldsPattern::Constructor { name, args } if name == "Num" && args == &[YieldsPattern::Int(10)]));
                assert!(matches!(&args[1], YieldsPattern::Constructor { name, args } if name == "Num" && args == &[YieldsPattern::Int(20)]));
            }
            other => panic!("expected a nested constructor pattern, got {other:?}"),
        }

        let Expectation::Yields(pattern) = &suite.cases[1].expectation else {
            panic!("expected a Yields expectation");
        };
        match pattern {
            YieldsPattern::Constructor { name, args } => {
                assert_eq!(name, "Add");
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0], YieldsPattern::Constructor { name, .. } if name == "Add"));
                assert!(matches!(&args[1], YieldsPattern::Constructor { name, args } if name == "Num" && args == &[YieldsPattern::Int(3)]));
            }
            other => panic!("expected a nested constructor pattern, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_argument_nested_among_constructor_args() {
        let grammar = first_grammar(CALC);
        let suite = &grammar.test_suites[0];
        let Expectation::Yields(YieldsPattern::Constructor { name, args }) = &suite.cases[2].expectation else {
            panic!("expected a Yields(Constructor) expectation");
        };
        assert_eq!(name, "Add");
        assert_eq!(args.len(), 2);
        assert!(matches!(args[0], YieldsPattern::Wildcard));
        assert!(matches!(&args[1], YieldsPattern::Constructor { name, args } if name == "Num" && args == &[YieldsPattern::Int(1)]));
    }
}
