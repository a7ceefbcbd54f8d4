//! The compiled grammar model (spec §3).
//!
//! Everything here is immutable once [`crate::lower`] has built it: the
//! semantic checker in `apy-checker` annotates rules (marking them
//! `left_recursive`, resolving references) but never renames or restructures
//! anything. Rules and tokens are addressed by small integer ids rather than
//! by reference, so the graph of rule-to-rule references has no ownership
//! cycles (spec §9, "Cyclic grammar graph").

use std::fmt;

/// The id of a [`Rule`] within its [`Grammar`], an index into
/// [`Grammar::rules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub u32);

/// The id of a [`Token`] within its [`Grammar`], an index into
/// [`Grammar::tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub u32);

/// The root of the compiled model: one `.apy` `grammar ... end` block.
#[derive(Debug, Clone)]
pub struct Grammar {
    /// The grammar's name, from `grammar <Name>:`.
    pub name: String,
    /// The lexer table, in declaration order. Synthetic tokens created from
    /// inline literals are appended by the checker after front-end parsing,
    /// per spec §9's synthetic-token ordering rule.
    pub tokens: Vec<Token>,
    /// The rule table, in declaration order.
    pub rules: Vec<Rule>,
    /// The grammar's embedded test suites, in declaration order.
    pub test_suites: Vec<TestSuite>,
    /// The id of the rule marked `start`, or the first rule if none was
    /// explicitly marked (spec §3: "exactly one start rule... with a warning
    /// if implicit").
    pub start_rule: Option<RuleId>,
}

impl Grammar {
    /// Looks up a rule by id.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0 as usize]
    }

    /// Looks up a token by id.
    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.0 as usize]
    }

    /// Finds a rule by name.
    pub fn find_rule(&self, name: &str) -> Option<RuleId> {
        self.rules
            .iter()
            .position(|r| r.name == name)
            .map(|i| RuleId(i as u32))
    }

    /// Finds a token by name.
    pub fn find_token(&self, name: &str) -> Option<TokenId> {
        self.tokens
            .iter()
            .position(|t| t.name == name)
            .map(|i| TokenId(i as u32))
    }
}

/// An entry in the lexer table (spec §3, "Token").
#[derive(Debug, Clone)]
pub struct Token {
    /// The token's name. By convention uppercase; enforced only as an
    /// advisory (spec §4.B.5).
    pub name: String,
    /// The token's pattern, in the host regex dialect, taken literally from
    /// the source line it was declared on.
    pub pattern: String,
    /// Whether matches of this token are consumed but not handed to the
    /// parser.
    pub skip: bool,
    /// Set for tokens synthesized from an inline string literal (spec §4.A,
    /// "Literal"); `None` for tokens the grammar author declared explicitly.
    pub synthetic_literal: Option<String>,
}

/// A named parsing procedure (spec §3, "Rule").
#[derive(Debug, Clone)]
pub struct Rule {
    /// The rule's name. By convention `PascalCase`.
    pub name: String,
    /// Whether this is the grammar's single start rule.
    pub is_start: bool,
    /// The rule's alternatives, tried in order (ordered choice).
    pub expressions: Vec<Expression>,
    /// Set by the checker's direct-left-recursion pass (spec §4.B.4): `true`
    /// if any alternative begins, after its binding prefix, with a
    /// reference to this rule.
    pub left_recursive: bool,
}

/// One alternative of a [`Rule`] (spec §3, "Expression").
#[derive(Debug, Clone)]
pub struct Expression {
    /// The sequence of terms that must all match, in order, for this
    /// alternative to succeed.
    pub terms: Vec<Term>,
    /// What to return when the term sequence matches.
    pub action: Action,
    /// An optional post-match guard.
    pub guard: Option<CheckGuard>,
}

/// An atomic match element within an [`Expression`] (spec §3, "Term").
#[derive(Debug, Clone)]
pub enum Term {
    /// Names a rule or token, resolved by the checker.
    Reference(Reference),
    /// A base term annotated with a repetition quantifier.
    Repetition {
        /// The repeated term.
        base: Box<Term>,
        /// The quantifier.
        quantifier: Quantifier,
    },
    /// A base term bound to a name, visible to the action and guard.
    Binding {
        /// The binding's name.
        name: String,
        /// The bound term.
        base: Box<Term>,
    },
}

/// A reference term: either a rule/token name, or an inline literal that is
/// promoted to a synthetic token.
#[derive(Debug, Clone)]
pub enum Reference {
    /// Names a rule or token by identifier. Resolved to a [`ResolvedTarget`]
    /// by the checker; `None` before checking or on an unresolved name.
    Named {
        /// The referenced name, as written.
        name: String,
        /// The checker's resolution, if any.
        resolved: Option<ResolvedTarget>,
    },
    /// An inline quoted literal, silently promoted to a synthetic token
    /// (spec §3, "Literal"; de-duplicated by content by the checker).
    Literal {
        /// The literal's unescaped text.
        text: String,
        /// The id of the synthetic token created for this literal, once
        /// resolved.
        token: Option<TokenId>,
    },
}

/// What a [`Reference::Named`] term resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Resolves to a rule.
    Rule(RuleId),
    /// Resolves to a token.
    Token(TokenId),
}

/// A repetition quantifier (spec §3, "Repetition").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// `?` — zero or one.
    Optional,
    /// `*` — zero or more.
    ZeroOrMore,
    /// `+` — one or more.
    OneOrMore,
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quantifier::Optional => "?",
            Quantifier::ZeroOrMore => "*",
            Quantifier::OneOrMore => "+",
        })
    }
}

/// What an [`Expression`] returns on success (spec §3, "Action").
#[derive(Debug, Clone)]
pub enum Action {
    /// `NodeName(arg1, ..., argN)`.
    Constructor {
        /// The constructed AST node's tag.
        name: String,
        /// The argument expressions, restricted to the whitelisted grammar
        /// of spec §9 ("Action execution sandbox").
        args: Vec<ActionArg>,
    },
    /// `pass`: the single binding if there is exactly one; else the single
    /// non-literal term's value if exactly one; else `null`.
    Pass,
}

/// One argument to a [`Action::Constructor`] (spec §9's whitelisted action
/// argument grammar).
#[derive(Debug, Clone)]
pub enum ActionArg {
    /// A bare identifier, referring to a binding.
    Ident(String),
    /// An integer literal.
    Int(i64),
    /// A string literal.
    Str(String),
    /// `fn(x)` where `fn` is one of the small built-in set (`int`, `float`,
    /// `str`, `len`).
    Call {
        /// The built-in function name.
        func: String,
        /// The single argument identifier.
        arg: String,
    },
}

/// An optional post-match guard (spec §3, "CheckGuard").
#[derive(Debug, Clone)]
pub struct CheckGuard {
    /// The opaque condition fragment, evaluated in the binding scope.
    pub condition: String,
    /// The opaque `then`-branch statement fragment.
    pub then_branch: String,
    /// The opaque `else`-branch statement fragment, if present.
    pub else_branch: Option<String>,
}

/// A named collection of grammar-embedded tests (spec §3, "TestSuite").
#[derive(Debug, Clone)]
pub struct TestSuite {
    /// The suite's name.
    pub name: String,
    /// The rule tests in this suite start parsing at; defaults to the
    /// grammar's start rule if not given.
    pub target_rule: Option<String>,
    /// The suite's test cases, in order.
    pub cases: Vec<TestCase>,
}

/// A single test case within a [`TestSuite`].
#[derive(Debug, Clone)]
pub struct TestCase {
    /// The input text to parse.
    pub input: String,
    /// What the parse is expected to do.
    pub expectation: Expectation,
}

/// A [`TestCase`]'s expected outcome.
#[derive(Debug, Clone)]
pub enum Expectation {
    /// The parse must succeed and consume all non-skip input.
    Success,
    /// The parse must report at least one error, or not consume all input.
    Fail,
    /// The parse must succeed and its AST must match `pattern` structurally.
    Yields(YieldsPattern),
}

/// An AST shape pattern used by a [`Expectation::Yields`] expectation.
#[derive(Debug, Clone, PartialEq)]
pub enum YieldsPattern {
    /// Matches any remaining value (`...`).
    Wildcard,
    /// An integer literal leaf.
    Int(i64),
    /// A single-quoted string leaf, matched against captured token text.
    Str(String),
    /// `Constructor(arg1, ..., argN)`, where a trailing [`YieldsPattern::Wildcard`]
    /// means "ignore remaining arguments".
    Constructor {
        /// The expected constructor tag.
        name: String,
        /// The expected (or partially-wildcarded) argument patterns.
        args: Vec<YieldsPattern>,
    },
}
