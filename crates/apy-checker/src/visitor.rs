//! The advisory-check trait pair (spec §4.B.5), modeled on the teacher's
//! lint-rule organization: each independently-testable check is a small
//! struct implementing [`Rule`], and a [`Validator`] runs all of them over
//! the grammar in one pass, collecting their diagnostics.

use apy_ast::Diagnostic;
use apy_ast::model::Grammar;

/// One advisory check over a compiled [`Grammar`].
///
/// Advisory checks never produce errors — only warnings — and never affect
/// whether the grammar is accepted (spec §4.B.5: "diagnostics only, never
/// fatal").
pub trait Rule {
    /// A short, human-readable name for this check, used in test failure
    /// messages and `--verbose` logging.
    fn name(&self) -> &'static str;

    /// Runs this check over `grammar`, appending any warnings found.
    fn check(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>);
}

/// Runs every advisory [`Rule`] over a grammar in one pass.
pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    /// Builds a validator with the full set of advisory checks (spec
    /// §4.B.5): naming conventions, unused tokens, token shadowing,
    /// unreachable rules, orphan AST constructors, unnecessary capture.
    pub fn with_default_rules() -> Self {
        use crate::advisory::NamingConventionRule;
        use crate::advisory::OrphanConstructorRule;
        use crate::advisory::TokenShadowingRule;
        use crate::advisory::UnnecessaryCaptureRule;
        use crate::advisory::UnreachableRuleRule;
        use crate::advisory::UnusedTokenRule;

        Self {
            rules: vec![
                Box::new(NamingConventionRule),
                Box::new(UnusedTokenRule),
                Box::new(TokenShadowingRule),
                Box::new(UnreachableRuleRule),
                Box::new(OrphanConstructorRule),
                Box::new(UnnecessaryCaptureRule),
            ],
        }
    }

    /// Runs every registered rule over `grammar`, appending warnings.
    pub fn run(&self, grammar: &Grammar, warnings: &mut Vec<Diagnostic>) {
        for rule in &self.rules {
            rule.check(grammar, warnings);
        }
    }
}
