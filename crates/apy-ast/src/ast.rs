//! Typed wrappers over the `apy-grammar` concrete syntax tree.
//!
//! Each type here borrows the `rust-analyzer`-style `AstNode` pattern: a
//! thin newtype around a [`SyntaxNode`] that asserts (via `can_cast`) which
//! [`SyntaxKind`] it wraps, and exposes typed accessors that walk the
//! underlying tree on demand rather than duplicating its data. `apy-ast`'s
//! [`crate::lower`] module walks these typed nodes once to build the
//! immutable [`crate::model::Grammar`].

use apy_grammar::SyntaxKind;
use apy_grammar::SyntaxNode;
use apy_grammar::SyntaxToken;

/// A node that can be cast from an untyped [`SyntaxNode`].
pub trait AstNode: Sized {
    /// Returns `true` if `kind` is the kind this type wraps.
    fn can_cast(kind: SyntaxKind) -> bool;
    /// Casts `node` to `Self`, or returns `None` if its kind doesn't match.
    fn cast(node: SyntaxNode) -> Option<Self>;
    /// The wrapped syntax node.
    fn syntax(&self) -> &SyntaxNode;
}

macro_rules! ast_node {
    ($name:ident, $kind:expr) => {
        #[doc = concat!("Typed wrapper for a [`SyntaxKind::", stringify!($kind), "`] node.")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == $kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                Self::can_cast(node.kind()).then_some(Self(node))
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

ast_node!(SourceFile, SyntaxKind::SourceFile);
ast_node!(GrammarDef, SyntaxKind::GrammarDef);
ast_node!(TokensBlock, SyntaxKind::TokensBlock);
ast_node!(TokenDef, SyntaxKind::TokenDef);
ast_node!(RuleDef, SyntaxKind::RuleDef);
ast_node!(ExprAlt, SyntaxKind::ExprAlt);
ast_node!(TermNode, SyntaxKind::Term);
ast_node!(RepetitionNode, SyntaxKind::Repetition);
ast_node!(BindingNode, SyntaxKind::Binding);
ast_node!(ActionNode, SyntaxKind::Action);
ast_node!(ConstructorActionNode, SyntaxKind::ConstructorAction);
ast_node!(ArgListNode, SyntaxKind::ArgList);
ast_node!(GuardNode, SyntaxKind::Guard);
ast_node!(TestBlockNode, SyntaxKind::TestBlock);
ast_node!(TestCaseNode, SyntaxKind::TestCase);
ast_node!(YieldsPatternNode, SyntaxKind::YieldsPattern);

/// Returns the first direct child token of `node` with kind `kind`.
fn child_token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|t| t.kind() == kind)
}

/// Returns every direct child token of `node` with kind `kind`.
fn child_tokens(node: &SyntaxNode, kind: SyntaxKind) -> impl Iterator<Item = SyntaxToken> + '_ {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .filter(move |t| t.kind() == kind)
}

/// Returns every direct child node of `node` that can cast to `T`.
fn children<T: AstNode>(node: &SyntaxNode) -> impl Iterator<Item = T> + '_ {
    node.children().filter_map(T::cast)
}

/// Returns the first direct child node of `node` that can cast to `T`.
fn child<T: AstNode>(node: &SyntaxNode) -> Option<T> {
    children(node).next()
}

impl SourceFile {
    /// The `grammar ... end` blocks in this file, in order.
    pub fn grammars(&self) -> impl Iterator<Item = GrammarDef> + '_ {
        children(self.syntax())
    }
}

impl GrammarDef {
    /// The grammar's name.
    pub fn name(&self) -> Option<String> {
        child_token(self.syntax(), SyntaxKind::Ident).map(|t| t.text().to_string())
    }

    /// This grammar's `tokens:` block, if present.
    pub fn tokens_block(&self) -> Option<TokensBlock> {
        child(self.syntax())
    }

    /// This grammar's rule definitions, in order.
    pub fn rules(&self) -> impl Iterator<Item = RuleDef> + '_ {
        children(self.syntax())
    }

    /// This grammar's embedded test blocks, in order.
    pub fn test_blocks(&self) -> impl Iterator<Item = TestBlockNode> + '_ {
        children(self.syntax())
    }
}

impl TokensBlock {
    /// The token definitions in this block, in order.
    pub fn tokens(&self) -> impl Iterator<Item = TokenDef> + '_ {
        children(self.syntax())
    }
}

impl TokenDef {
    /// The token's name.
    pub fn name(&self) -> Option<String> {
        child_token(self.syntax(), SyntaxKind::Ident).map(|t| t.text().to_string())
    }

    /// Whether this token carries the `skip` modifier.
    pub fn is_skip(&self) -> bool {
        child_token(self.syntax(), SyntaxKind::SkipKw).is_some()
    }

    /// The raw pattern text.
    pub fn pattern(&self) -> Option<String> {
        child_token(self.syntax(), SyntaxKind::Pattern).map(|t| t.text().to_string())
    }
}

impl RuleDef {
    /// The rule's name.
    pub fn name(&self) -> Option<String> {
        child_token(self.syntax(), SyntaxKind::Ident).map(|t| t.text().to_string())
    }

    /// Whether this rule is marked `start`.
    pub fn is_start(&self) -> bool {
        child_token(self.syntax(), SyntaxKind::StartKw).is_some()
    }

    /// The rule's alternatives, in order.
    pub fn alts(&self) -> impl Iterator<Item = ExprAlt> + '_ {
        children(self.syntax())
    }
}

impl ExprAlt {
    /// The terms in this alternative's sequence.
    pub fn terms(&self) -> impl Iterator<Item = TermNode> + '_ {
        self.syntax()
            .children()
            .find(|n| n.kind() == SyntaxKind::TermList)
            .into_iter()
            .flat_map(|list| children(&list))
    }

    /// The alternative's action.
    pub fn action(&self) -> Option<ActionNode> {
        child(self.syntax())
    }

    /// The alternative's guard, if present.
    pub fn guard(&self) -> Option<GuardNode> {
        child(self.syntax())
    }
}

impl TermNode {
    /// This term's binding name, if it has a `name:` prefix.
    pub fn binding_name(&self) -> Option<String> {
        // The binding's name identifier is the first Ident token in the
        // term, emitted before the base term's own identifier/string only
        // when a `Binding` child node is present.
        self.syntax()
            .children()
            .find(|n| n.kind() == SyntaxKind::Binding)?;
        child_tokens(self.syntax(), SyntaxKind::Ident).next().map(|t| t.text().to_string())
    }

    /// The base term's identifier or string literal token, i.e. the
    /// reference or literal itself (skipping the binding name token, if
    /// any).
    pub fn base_token(&self) -> Option<SyntaxToken> {
        let has_binding = self
            .syntax()
            .children()
            .any(|n| n.kind() == SyntaxKind::Binding);
        let idents_and_strings = self.syntax().children_with_tokens().filter_map(|it| {
            let t = it.into_token()?;
            matches!(t.kind(), SyntaxKind::Ident | SyntaxKind::String).then_some(t)
        });
        if has_binding {
            idents_and_strings.skip(1).next()
        } else {
            idents_and_strings.take(1).last()
        }
    }

    /// The term's repetition quantifier token (`?`, `*`, `+`), if any.
    pub fn quantifier_token(&self) -> Option<SyntaxToken> {
        let rep = self
            .syntax()
            .children()
            .find(|n| n.kind() == SyntaxKind::Repetition)?;
        rep.children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::Question | SyntaxKind::Star | SyntaxKind::Plus
                )
            })
    }
}

impl ActionNode {
    /// Whether this action is `pass`.
    pub fn is_pass(&self) -> bool {
        self.syntax()
            .children()
            .any(|n| n.kind() == SyntaxKind::PassAction)
    }

    /// The constructor sub-node, if this is not a `pass` action.
    pub fn constructor(&self) -> Option<ConstructorActionNode> {
        child(self.syntax())
    }
}

impl ConstructorActionNode {
    /// The constructor's node name.
    pub fn name(&self) -> Option<String> {
        child_token(self.syntax(), SyntaxKind::Ident).map(|t| t.text().to_string())
    }

    /// The argument list.
    pub fn arg_list(&self) -> Option<ArgListNode> {
        child(self.syntax())
    }
}

impl ArgListNode {
    /// The argument tokens, in order: each is either a single `Ident`/`Int`/
    /// `String` token, or (for a `fn(x)` call) an `Ident` token immediately
    /// followed by a parenthesized `Ident`.
    pub fn raw_tokens(&self) -> Vec<SyntaxToken> {
        self.syntax()
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| !t.kind().is_trivia())
            .collect()
    }
}

impl GuardNode {
    /// The condition fragment's raw text.
    pub fn condition(&self) -> Option<String> {
        child_tokens(self.syntax(), SyntaxKind::Pattern)
            .next()
            .map(|t| t.text().to_string())
    }

    /// The `then`-branch fragment's raw text.
    pub fn then_branch(&self) -> Option<String> {
        child_tokens(self.syntax(), SyntaxKind::Pattern)
            .nth(1)
            .map(|t| t.text().to_string())
    }

    /// The `else`-branch fragment's raw text, if present.
    pub fn else_branch(&self) -> Option<String> {
        child_tokens(self.syntax(), SyntaxKind::Pattern)
            .nth(2)
            .map(|t| t.text().to_string())
    }
}

impl TestBlockNode {
    /// The test suite's name and optional target rule name, in source
    /// order (`test Name [Rule]:`).
    pub fn names(&self) -> Vec<String> {
        child_tokens(self.syntax(), SyntaxKind::Ident)
            .map(|t| t.text().to_string())
            .collect()
    }

    /// The test cases in this suite, in order.
    pub fn cases(&self) -> impl Iterator<Item = TestCaseNode> + '_ {
        children(self.syntax())
    }
}

impl TestCaseNode {
    /// The test input's raw (quoted) text.
    pub fn input(&self) -> Option<String> {
        child_token(self.syntax(), SyntaxKind::String).map(|t| t.text().to_string())
    }

    /// The expectation keyword (`Success`/`Fail`/`Yields`) and, for
    /// `Yields`, the pattern sub-node.
    pub fn expectation_ident(&self) -> Option<String> {
        child_token(self.syntax(), SyntaxKind::Ident).map(|t| t.text().to_string())
    }

    /// The `Yields(...)` pattern, if this case expects `Yields`.
    pub fn yields_pattern(&self) -> Option<YieldsPatternNode> {
        child(self.syntax())
    }
}
