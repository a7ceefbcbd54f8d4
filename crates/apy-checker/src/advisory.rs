//! The six advisory checks from spec §4.B.5, each its own [`Rule`].

use std::collections::HashMap;
use std::collections::HashSet;

use apy_ast::Diagnostic;
use apy_ast::model::Action;
use apy_ast::model::Grammar;
use apy_ast::model::Reference;
use apy_ast::model::ResolvedTarget;
use apy_ast::model::RuleId;
use apy_ast::model::Term;

use crate::visitor::Rule;

/// Flags tokens not named in `UPPER_SNAKE_CASE` and rules not named in
/// `PascalCase`, per the conventions spec §3 documents.
pub struct NamingConventionRule;

impl Rule for NamingConventionRule {
    fn name(&self) -> &'static str {
        "naming-convention"
    }

    fn check(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>) {
        for token in &grammar.tokens {
            if token.synthetic_literal.is_some() {
                continue;
            }
            if !token.name.chars().all(|c| !c.is_alphabetic() || c.is_uppercase()) {
                warnings.push(Diagnostic::warning().with_message(format!(
                    "token `{}` should be uppercase by convention",
                    token.name
                )));
            }
        }
        for rule in &grammar.rules {
            let starts_upper = rule.name.chars().next().is_some_and(|c| c.is_uppercase());
            if !starts_upper || rule.name.contains('_') {
                warnings.push(Diagnostic::warning().with_message(format!(
                    "rule `{}` should be PascalCase by convention",
                    rule.name
                )));
            }
        }
    }
}

/// Flags non-`skip` tokens that no rule references (dead entries in the
/// lexer table).
pub struct UnusedTokenRule;

impl Rule for UnusedTokenRule {
    fn name(&self) -> &'static str {
        "unused-token"
    }

    fn check(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>) {
        let mut referenced: HashSet<u32> = HashSet::new();
        for rule in &grammar.rules {
            for expr in &rule.expressions {
                for term in &expr.terms {
                    collect_token_refs(term, &mut referenced);
                }
            }
        }
        for (i, token) in grammar.tokens.iter().enumerate() {
            if token.skip || token.synthetic_literal.is_some() {
                continue;
            }
            if !referenced.contains(&(i as u32)) {
                warnings.push(Diagnostic::warning().with_message(format!(
                    "token `{}` is never used by any rule",
                    token.name
                )));
            }
        }
    }
}

fn collect_token_refs(term: &Term, out: &mut HashSet<u32>) {
    match term {
        Term::Reference(Reference::Named {
            resolved: Some(ResolvedTarget::Token(id)),
            ..
        }) => {
            out.insert(id.0);
        }
        Term::Reference(Reference::Literal { token: Some(id), .. }) => {
            out.insert(id.0);
        }
        Term::Reference(_) => {}
        Term::Binding { base, .. } | Term::Repetition { base, .. } => collect_token_refs(base, out),
    }
}

/// Flags a token whose pattern is broad enough to always shadow a later,
/// more specific literal-like token (e.g. a generic identifier token
/// declared before a keyword token it would always match first).
///
/// This is a heuristic, not a full regex-containment solver: it only
/// catches the common case where the *later* token's pattern has no regex
/// metacharacters (so it denotes a fixed literal) and the *earlier* token's
/// compiled pattern matches that literal in full.
pub struct TokenShadowingRule;

impl Rule for TokenShadowingRule {
    fn name(&self) -> &'static str {
        "token-shadowing"
    }

    fn check(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>) {
        for (i, earlier) in grammar.tokens.iter().enumerate() {
            let Ok(earlier_re) = regex::Regex::new(&format!("^(?:{})$", earlier.pattern)) else {
                continue;
            };
            for later in &grammar.tokens[i + 1..] {
                if is_fixed_literal(&later.pattern) && earlier_re.is_match(&later.pattern) {
                    warnings.push(Diagnostic::warning().with_message(format!(
                        "token `{}` is declared before `{}` and its pattern would always match first, shadowing it",
                        earlier.name, later.name
                    )));
                }
            }
        }
    }
}

/// Returns `true` if `pattern` contains no regex metacharacters, i.e. it
/// denotes exactly one fixed string.
fn is_fixed_literal(pattern: &str) -> bool {
    !pattern.chars().any(|c| "\\^$.|?*+()[]{}".contains(c))
}

/// Flags rules with no path from the start rule.
pub struct UnreachableRuleRule;

impl Rule for UnreachableRuleRule {
    fn name(&self) -> &'static str {
        "unreachable-rule"
    }

    fn check(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>) {
        let Some(start) = grammar.start_rule else {
            return;
        };

        let mut reachable: HashSet<u32> = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !reachable.insert(id.0) {
                continue;
            }
            for expr in &grammar.rule(id).expressions {
                for term in &expr.terms {
                    collect_rule_refs(term, &mut stack);
                }
            }
        }

        for (i, rule) in grammar.rules.iter().enumerate() {
            if !reachable.contains(&(i as u32)) {
                warnings.push(Diagnostic::warning().with_message(format!(
                    "rule `{}` is unreachable from the start rule",
                    rule.name
                )));
            }
        }
    }
}

fn collect_rule_refs(term: &Term, out: &mut Vec<RuleId>) {
    match term {
        Term::Reference(Reference::Named {
            resolved: Some(ResolvedTarget::Rule(id)),
            ..
        }) => out.push(*id),
        Term::Reference(_) => {}
        Term::Binding { base, .. } | Term::Repetition { base, .. } => collect_rule_refs(base, out),
    }
}

/// Flags a constructor name used with more than one argument count across
/// the grammar, which the emitter can't give a single consistent AST node
/// shape.
pub struct OrphanConstructorRule;

impl Rule for OrphanConstructorRule {
    fn name(&self) -> &'static str {
        "orphan-constructor"
    }

    fn check(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>) {
        let mut arities: HashMap<&str, HashSet<usize>> = HashMap::new();
        for rule in &grammar.rules {
            for expr in &rule.expressions {
                if let Action::Constructor { name, args } = &expr.action {
                    arities.entry(name.as_str()).or_default().insert(args.len());
                }
            }
        }
        for (name, counts) in &arities {
            if counts.len() > 1 {
                let mut counts: Vec<_> = counts.iter().collect();
                counts.sort_unstable();
                warnings.push(Diagnostic::warning().with_message(format!(
                    "constructor `{name}` is used with differing argument counts: {counts:?}"
                )));
            }
        }
    }
}

/// Flags a `pass` action whose alternative has more than one binding, since
/// `pass` can only return one value and the rest are silently dropped.
pub struct UnnecessaryCaptureRule;

impl Rule for UnnecessaryCaptureRule {
    fn name(&self) -> &'static str {
        "unnecessary-capture"
    }

    fn check(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>) {
        for rule in &grammar.rules {
            for expr in &rule.expressions {
                if !matches!(expr.action, Action::Pass) {
                    continue;
                }
                let binding_count = expr.terms.iter().filter(|t| count_bindings(t) > 0).count();
                if binding_count > 1 {
                    warnings.push(Diagnostic::warning().with_message(format!(
                        "rule `{}` has a `pass` action with {} bindings; only one can be returned",
                        rule.name, binding_count
                    )));
                }
            }
        }
    }
}

fn count_bindings(term: &Term) -> usize {
    match term {
        Term::Binding { base, .. } => 1 + count_bindings(base),
        Term::Repetition { base, .. } => count_bindings(base),
        Term::Reference(_) => 0,
    }
}
