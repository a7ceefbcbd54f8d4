//! Static sync-token derivation for panic-mode recovery (spec §4.D, "Error
//! recovery (Panic Mode)": "Synchronization tokens are derived statically
//! during emission as any token that appears as a rule's first or last
//! token.").

use std::collections::HashSet;

use apy_ast::model::Grammar;
use apy_ast::model::Reference;
use apy_ast::model::ResolvedTarget;
use apy_ast::model::Term;

/// The set of token names recovery may synchronize on, computed once per
/// compiled [`Grammar`].
#[derive(Debug, Clone, Default)]
pub struct SyncTokens(HashSet<String>);

impl SyncTokens {
    /// Computes the sync-token set for `grammar`: every token name that
    /// appears, after peeling binding/repetition wrappers, as the first or
    /// last term of any rule alternative.
    pub fn derive(grammar: &Grammar) -> Self {
        let mut names = HashSet::new();
        for rule in &grammar.rules {
            for expr in &rule.expressions {
                if let Some(first) = expr.terms.first() {
                    collect_token_name(first, grammar, &mut names);
                }
                if let Some(last) = expr.terms.last() {
                    collect_token_name(last, grammar, &mut names);
                }
            }
        }
        Self(names)
    }

    /// Returns `true` if `name` is a recognized synchronization token.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

fn collect_token_name(term: &Term, grammar: &Grammar, out: &mut HashSet<String>) {
    match term {
        Term::Reference(Reference::Named {
            resolved: Some(ResolvedTarget::Token(id)),
            ..
        }) => {
            out.insert(grammar.token(*id).name.clone());
        }
        Term::Reference(Reference::Literal { token: Some(id), .. }) => {
            out.insert(grammar.token(*id).name.clone());
        }
        Term::Reference(_) => {}
        Term::Binding { base, .. } | Term::Repetition { base, .. } => {
            collect_token_name(base, grammar, out)
        }
    }
}
