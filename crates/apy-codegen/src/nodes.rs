//! Collects the AST node declarations a generated parser needs (spec §4.E:
//! "Emit AST node type declarations for every constructor name referenced
//! in any action, with a consistent arity per name").

use indexmap::IndexMap;

use apy_ast::model::Action;
use apy_ast::model::Grammar;

/// One constructor tag's declaration info: its name and the arity to
/// document/generate against.
#[derive(Debug, Clone)]
pub struct NodeDecl {
    /// The constructor's tag, e.g. `Add`.
    pub name: String,
    /// The arity most alternatives construct it with. When call sites
    /// disagree (spec §4.B.5's "orphan AST constructors" advisory already
    /// flags this as a warning at check time), the *first* arity seen wins
    /// — the declaration is documentation plus a thin wrapper, not a
    /// compile-time arity enforcement mechanism.
    pub arity: usize,
}

/// Walks every action in `grammar` and returns one [`NodeDecl`] per
/// distinct constructor tag, in first-seen order (stable across runs for
/// a given grammar, satisfying spec §4.E's determinism requirement).
pub fn collect_node_decls(grammar: &Grammar) -> Vec<NodeDecl> {
    let mut seen: IndexMap<String, usize> = IndexMap::new();
    for rule in &grammar.rules {
        for expr in &rule.expressions {
            if let Action::Constructor { name, args } = &expr.action {
                seen.entry(name.clone()).or_insert(args.len());
            }
        }
    }
    seen.into_iter().map(|(name, arity)| NodeDecl { name, arity }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(src: &str) -> Grammar {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        apy_ast::lower(&parsed.tree).grammars.remove(0)
    }

    #[test]
    fn collects_distinct_constructor_tags_in_first_seen_order() {
        let src = r#"
grammar Calc:
    tokens:
        NUMBER: [0-9]+
        PLUS: \+
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
        let grammar = lower(src);
        let decls = collect_node_decls(&grammar);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "Add");
        assert_eq!(decls[0].arity, 2);
        assert_eq!(decls[1].name, "Num");
        assert_eq!(decls[1].arity, 1);
    }
}
