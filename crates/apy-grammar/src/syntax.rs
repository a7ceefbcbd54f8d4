//! The concrete syntax kind set for `.apy` source files.
//!
//! The front-end parser builds a lossless [`rowan`] tree tagged with
//! [`SyntaxKind`]: every byte of the input, including comments and
//! whitespace, is represented as a token somewhere in the tree. The typed
//! AST layer in `apy-ast` casts over this tree rather than owning its own
//! copy of the source.

use rowan::Language as _;

/// The kind of a node or token in the `.apy` concrete syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum SyntaxKind {
    // Trivia.
    Whitespace = 0,
    Comment,

    // Punctuation.
    Colon,
    Pipe,
    Arrow,
    FatArrow,
    Question,
    Star,
    Plus,
    LParen,
    RParen,
    Comma,
    DotDotDot,

    // Keywords.
    GrammarKw,
    EndKw,
    TokensKw,
    RuleKw,
    StartKw,
    TestKw,
    SkipKw,
    CheckKw,
    ThenKw,
    ElseKw,
    PassKw,
    ErrorKw,

    // Leaf tokens carrying text.
    Ident,
    /// A quoted string literal (`"…"` or `'…'`), unescaped text between the
    /// quotes is the token's text verbatim, including the quotes themselves.
    String,
    /// The raw rest-of-line text of a token pattern declaration.
    Pattern,
    /// An integer literal, used only inside `Yields(...)` test patterns.
    Int,

    /// A token the lexer could not classify; preserved so the tree stays
    /// lossless even over malformed input.
    Unknown,

    // Composite nodes.
    SourceFile,
    GrammarDef,
    TokensBlock,
    TokenDef,
    RuleDef,
    ExprAlt,
    TermList,
    Term,
    Repetition,
    Binding,
    Action,
    ConstructorAction,
    PassAction,
    ArgList,
    Guard,
    TestBlock,
    TestCase,
    YieldsPattern,
    /// A syntax error recovery node: the span of input skipped while
    /// synchronizing after a [`SyntaxKind::Unknown`] token or missing
    /// construct.
    ErrorNode,
}

impl SyntaxKind {
    /// Every variant, indexed by its discriminant. Kept in sync with the
    /// enum's declaration order so [`rowan::Language::kind_from_raw`] can
    /// recover a `SyntaxKind` from the `u16` rowan stores internally.
    const ALL: &'static [SyntaxKind] = &[
        SyntaxKind::Whitespace,
        SyntaxKind::Comment,
        SyntaxKind::Colon,
        SyntaxKind::Pipe,
        SyntaxKind::Arrow,
        SyntaxKind::FatArrow,
        SyntaxKind::Question,
        SyntaxKind::Star,
        SyntaxKind::Plus,
        SyntaxKind::LParen,
        SyntaxKind::RParen,
        SyntaxKind::Comma,
        SyntaxKind::DotDotDot,
        SyntaxKind::GrammarKw,
        SyntaxKind::EndKw,
        SyntaxKind::TokensKw,
        SyntaxKind::RuleKw,
        SyntaxKind::StartKw,
        SyntaxKind::TestKw,
        SyntaxKind::SkipKw,
        SyntaxKind::CheckKw,
        SyntaxKind::ThenKw,
        SyntaxKind::ElseKw,
        SyntaxKind::PassKw,
        SyntaxKind::ErrorKw,
        SyntaxKind::Ident,
        SyntaxKind::String,
        SyntaxKind::Pattern,
        SyntaxKind::Int,
        SyntaxKind::Unknown,
        SyntaxKind::SourceFile,
        SyntaxKind::GrammarDef,
        SyntaxKind::TokensBlock,
        SyntaxKind::TokenDef,
        SyntaxKind::RuleDef,
        SyntaxKind::ExprAlt,
        SyntaxKind::TermList,
        SyntaxKind::Term,
        SyntaxKind::Repetition,
        SyntaxKind::Binding,
        SyntaxKind::Action,
        SyntaxKind::ConstructorAction,
        SyntaxKind::PassAction,
        SyntaxKind::ArgList,
        SyntaxKind::Guard,
        SyntaxKind::TestBlock,
        SyntaxKind::TestCase,
        SyntaxKind::YieldsPattern,
        SyntaxKind::ErrorNode,
    ];

    /// Returns `true` if this token kind should be skipped by consumers that
    /// only care about meaningful tokens (but is still stored in the tree).
    pub fn is_trivia(self) -> bool {
        matches!(self, SyntaxKind::Whitespace | SyntaxKind::Comment)
    }
}

/// Marker type implementing [`rowan::Language`] for `.apy` syntax trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApyLanguage {}

impl rowan::Language for ApyLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        SyntaxKind::ALL
            .get(raw.0 as usize)
            .copied()
            .unwrap_or_else(|| panic!("invalid syntax kind discriminant {}", raw.0))
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind as u16)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        ApyLanguage::kind_to_raw(kind)
    }
}

/// A node in the `.apy` concrete syntax tree.
pub type SyntaxNode = rowan::SyntaxNode<ApyLanguage>;
/// A token in the `.apy` concrete syntax tree.
pub type SyntaxToken = rowan::SyntaxToken<ApyLanguage>;
/// A node or a token in the `.apy` concrete syntax tree.
pub type SyntaxElement = rowan::SyntaxElement<ApyLanguage>;
