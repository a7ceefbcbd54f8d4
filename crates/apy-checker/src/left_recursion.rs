//! Direct left-recursion marking (spec §4.B.4).

use std::collections::HashSet;

use apy_ast::model::Grammar;
use apy_ast::model::Reference;
use apy_ast::model::ResolvedTarget;
use apy_ast::model::RuleId;
use apy_ast::model::Term;

/// Marks every rule that is directly left-recursive: some alternative's
/// first term, after peeling any binding prefix, refers back to the rule
/// itself. Must run after [`crate::resolve::resolve`] so references are
/// already resolved. Indirect left recursion is not detected (spec §4.B.4,
/// "left as an open question").
pub fn mark_left_recursive(grammar: &mut Grammar) -> HashSet<RuleId> {
    let mut left_recursive = HashSet::new();
    for (i, rule) in grammar.rules.iter().enumerate() {
        let id = RuleId(i as u32);
        let is_left_recursive = rule.expressions.iter().any(|expr| {
            expr.terms
                .first()
                .is_some_and(|term| first_term_refers_to(term, id))
        });
        if is_left_recursive {
            left_recursive.insert(id);
        }
    }

    for (i, rule) in grammar.rules.iter_mut().enumerate() {
        rule.left_recursive = left_recursive.contains(&RuleId(i as u32));
    }

    left_recursive
}

fn first_term_refers_to(term: &Term, id: RuleId) -> bool {
    match term {
        Term::Reference(Reference::Named {
            resolved: Some(ResolvedTarget::Rule(r)),
            ..
        }) => *r == id,
        Term::Reference(_) => false,
        Term::Binding { base, .. } => first_term_refers_to(base, id),
        // A repeated term can never match zero-or-more times *before*
        // being tried once, so the repetition itself (not its base) is
        // what's "first" here too, but a repeated self-reference inside a
        // quantifier isn't direct left recursion in the classic sense
        // (the rule is still invoked through the repetition operator, not
        // as the unconditional first step) — treat it the same as a plain
        // reference for this check.
        Term::Repetition { base, .. } => first_term_refers_to(base, id),
    }
}
