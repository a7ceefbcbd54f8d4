//! The `.apy` front-end parser (spec §4.A).
//!
//! Recognizes `grammar ... end` blocks, nested `tokens:` blocks, `rule`/
//! `start rule` definitions, and `test` blocks, building a lossless
//! [`rowan`] tree as it goes. On a malformed construct it reports a
//! [`SyntaxKind::ErrorNode`]-wrapped [`Diagnostic`] and resynchronizes at the
//! next top-level keyword, so a single pass can surface multiple syntax
//! errors (spec: "continues past the failing construct").

use rowan::GreenNodeBuilder;

use crate::diagnostic::Diagnostic;
use crate::diagnostic::Label;
use crate::lexer::Lexer;
use crate::lexer::LexedToken;
use crate::lexer::line_col;
use crate::syntax::SyntaxKind;
use crate::syntax::SyntaxNode;

/// Top-level keywords the parser resynchronizes to after a syntax error.
const TOP_LEVEL_SYNC: &[SyntaxKind] = &[
    SyntaxKind::GrammarKw,
    SyntaxKind::TokensKw,
    SyntaxKind::RuleKw,
    SyntaxKind::StartKw,
    SyntaxKind::TestKw,
    SyntaxKind::EndKw,
];

/// The result of parsing a `.apy` file: the concrete syntax tree and any
/// syntax diagnostics collected along the way.
#[derive(Debug)]
pub struct ParseOutput {
    /// The root `SourceFile` node.
    pub tree: SyntaxNode,
    /// Syntax errors encountered while parsing. Non-empty means the tree
    /// contains one or more `ErrorNode`s.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses `.apy` source text into a concrete syntax tree.
pub fn parse(source: &str) -> ParseOutput {
    let mut parser = Parser::new(source);
    parser.parse_source_file();
    let tree = SyntaxNode::new_root(parser.builder.finish());
    ParseOutput {
        tree,
        diagnostics: parser.diagnostics,
    }
}

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    peeked: Option<LexedToken>,
    builder: GreenNodeBuilder<'static>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            peeked: None,
            builder: GreenNodeBuilder::new(),
            diagnostics: Vec::new(),
        }
    }

    // --- low-level token plumbing -----------------------------------------

    fn fetch(&mut self) -> Option<LexedToken> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next();
        }
        self.peeked.clone()
    }

    /// Folds leading trivia (whitespace/comments) into the tree, leaving the
    /// next meaningful token (if any) buffered in `self.peeked`.
    fn skip_trivia(&mut self) {
        while let Some(tok) = self.fetch() {
            if !tok.kind.is_trivia() {
                break;
            }
            self.builder
                .token(tok.kind.into(), &self.source[tok.span.clone()]);
            self.peeked = None;
        }
    }

    /// The next meaningful token kind, or `None` at end of input.
    fn peek(&mut self) -> Option<SyntaxKind> {
        self.skip_trivia();
        self.fetch().map(|t| t.kind)
    }

    fn at(&mut self, kind: SyntaxKind) -> bool {
        self.peek() == Some(kind)
    }

    /// Consumes the next meaningful token (after folding trivia) into the
    /// tree. Panics if called at end of input; callers must check [`Self::at`]
    /// or [`Self::peek`] first.
    fn bump(&mut self) -> LexedToken {
        self.skip_trivia();
        let tok = self.peeked.take().expect("bump called at end of input");
        self.builder
            .token(tok.kind.into(), &self.source[tok.span.clone()]);
        tok
    }

    /// Repositions the lexer to the start of any buffered-but-undiscarded
    /// peeked token, so that a raw (non-tokenized) capture starts at exactly
    /// the right byte offset. Must be called before
    /// [`Lexer::capture_pattern_line`] / [`Lexer::capture_until_keyword`].
    fn sync_for_raw_capture(&mut self) {
        if let Some(tok) = self.peeked.take() {
            self.lexer.seek(tok.span.start);
        }
    }

    fn error_at(&mut self, span: std::ops::Range<usize>, message: impl Into<String>) {
        let (line, column) = line_col(self.source, span.start);
        let message = message.into();
        self.diagnostics.push(
            Diagnostic::error()
                .with_message(format!("{message} (line {line}, column {column})"))
                .with_labels(vec![Label::primary((), span)]),
        );
    }

    /// Consumes the next meaningful token, reporting a syntax error if it is
    /// not `kind`. On mismatch, nothing is consumed.
    fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            let span = self
                .fetch()
                .map(|t| t.span)
                .unwrap_or(self.source.len()..self.source.len());
            self.error_at(span, format!("expected {what}"));
            false
        }
    }

    /// Consumes tokens until one in `TOP_LEVEL_SYNC` (or end of input),
    /// wrapping them in an `ErrorNode` so the tree stays lossless.
    fn recover_to_top_level(&mut self) {
        self.builder.start_node(SyntaxKind::ErrorNode.into());
        while let Some(kind) = self.peek() {
            if TOP_LEVEL_SYNC.contains(&kind) {
                break;
            }
            self.bump();
        }
        self.builder.finish_node();
    }

    // --- grammar -----------------------------------------------------------

    fn parse_source_file(&mut self) {
        self.builder.start_node(SyntaxKind::SourceFile.into());
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(SyntaxKind::GrammarKw) => self.parse_grammar_def(),
                None => break,
                Some(_) => {
                    self.error_at(
                        self.fetch().map(|t| t.span).unwrap_or_default(),
                        "expected `grammar`",
                    );
                    self.recover_to_top_level();
                }
            }
        }
        self.builder.finish_node();
    }

    fn parse_grammar_def(&mut self) {
        self.builder.start_node(SyntaxKind::GrammarDef.into());
        self.bump(); // 'grammar'
        self.expect(SyntaxKind::Ident, "a grammar name");
        self.expect(SyntaxKind::Colon, "`:`");

        loop {
            match self.peek() {
                Some(SyntaxKind::TokensKw) => self.parse_tokens_block(),
                Some(SyntaxKind::RuleKw) | Some(SyntaxKind::StartKw) => self.parse_rule_def(),
                Some(SyntaxKind::TestKw) => self.parse_test_block(),
                Some(SyntaxKind::EndKw) => {
                    self.bump();
                    break;
                }
                None => {
                    self.error_at(
                        self.source.len()..self.source.len(),
                        "unexpected end of input inside `grammar` block",
                    );
                    break;
                }
                Some(_) => {
                    self.error_at(
                        self.fetch().map(|t| t.span).unwrap_or_default(),
                        "expected `tokens`, `rule`, `start`, `test`, or `end`",
                    );
                    self.recover_to_top_level();
                }
            }
        }
        self.builder.finish_node();
    }

    fn parse_tokens_block(&mut self) {
        self.builder.start_node(SyntaxKind::TokensBlock.into());
        self.bump(); // 'tokens'
        self.expect(SyntaxKind::Colon, "`:`");

        loop {
            match self.peek() {
                Some(SyntaxKind::Ident) => self.parse_token_def(),
                Some(SyntaxKind::EndKw) => {
                    self.bump();
                    break;
                }
                None => break,
                Some(_) => {
                    self.error_at(
                        self.fetch().map(|t| t.span).unwrap_or_default(),
                        "expected a token name or `end`",
                    );
                    self.recover_to_top_level();
                    break;
                }
            }
        }
        self.builder.finish_node();
    }

    fn parse_token_def(&mut self) {
        self.builder.start_node(SyntaxKind::TokenDef.into());
        self.bump(); // NAME
        self.expect(SyntaxKind::Colon, "`:`");
        self.skip_trivia();
        if self.at(SyntaxKind::SkipKw) {
            self.bump();
            self.skip_trivia();
        }
        self.sync_for_raw_capture();
        let pattern = self.lexer.capture_pattern_line();
        self.builder
            .token(pattern.kind.into(), self.source[pattern.span.clone()].trim());
        self.builder.finish_node();
    }

    fn parse_rule_def(&mut self) {
        self.builder.start_node(SyntaxKind::RuleDef.into());
        if self.at(SyntaxKind::StartKw) {
            self.bump();
        }
        self.expect(SyntaxKind::RuleKw, "`rule`");
        self.expect(SyntaxKind::Ident, "a rule name");
        self.expect(SyntaxKind::Colon, "`:`");

        loop {
            match self.peek() {
                Some(SyntaxKind::Pipe) => self.parse_expr_alt(),
                Some(SyntaxKind::EndKw) => {
                    self.bump();
                    break;
                }
                None => break,
                Some(_) => {
                    self.error_at(
                        self.fetch().map(|t| t.span).unwrap_or_default(),
                        "expected `|` or `end`",
                    );
                    self.recover_to_top_level();
                    break;
                }
            }
        }
        self.builder.finish_node();
    }

    fn parse_expr_alt(&mut self) {
        self.builder.start_node(SyntaxKind::ExprAlt.into());
        self.bump(); // '|'

        self.builder.start_node(SyntaxKind::TermList.into());
        while matches!(self.peek(), Some(SyntaxKind::Ident) | Some(SyntaxKind::String)) {
            self.parse_term();
        }
        self.builder.finish_node();

        self.expect(SyntaxKind::Arrow, "`->`");
        self.parse_action();

        if self.at(SyntaxKind::CheckKw) {
            self.parse_guard();
        }
        self.builder.finish_node();
    }

    fn parse_term(&mut self) {
        self.builder.start_node(SyntaxKind::Term.into());

        // Optional `name:` binding prefix. Only valid ahead of an
        // identifier/string base term, so peek two tokens (ident, colon)
        // without a space-sensitive lookahead: an `Ident` immediately
        // followed by `Colon` is a binding, otherwise the `Ident` is the
        // base term itself (a rule/token reference).
        if self.at(SyntaxKind::Ident) {
            let save = self.peeked.clone();
            let ident_tok = self.bump();
            if self.at(SyntaxKind::Colon) {
                self.builder.start_node(SyntaxKind::Binding.into());
                self.builder.finish_node();
                self.bump(); // ':'
            } else {
                // Not a binding: the identifier we already bumped *is* the
                // base term. Re-open as a reference by simply leaving it in
                // the tree; nothing further to do here but fall through to
                // quantifier handling below.
                let _ = save;
                let _ = &ident_tok;
                self.parse_repetition_suffix();
                self.builder.finish_node();
                return;
            }
        }

        match self.peek() {
            Some(SyntaxKind::Ident) | Some(SyntaxKind::String) => {
                self.bump();
            }
            _ => {
                self.error_at(
                    self.fetch().map(|t| t.span).unwrap_or_default(),
                    "expected a rule/token reference or a quoted literal",
                );
            }
        }
        self.parse_repetition_suffix();
        self.builder.finish_node();
    }

    fn parse_repetition_suffix(&mut self) {
        if matches!(
            self.peek(),
            Some(SyntaxKind::Question) | Some(SyntaxKind::Star) | Some(SyntaxKind::Plus)
        ) {
            self.builder.start_node(SyntaxKind::Repetition.into());
            self.bump();
            self.builder.finish_node();
        }
    }

    fn parse_action(&mut self) {
        self.builder.start_node(SyntaxKind::Action.into());
        if self.at(SyntaxKind::PassKw) {
            self.builder.start_node(SyntaxKind::PassAction.into());
            self.bump();
            self.builder.finish_node();
        } else {
            self.builder.start_node(SyntaxKind::ConstructorAction.into());
            self.expect(SyntaxKind::Ident, "a constructor name");
            self.expect(SyntaxKind::LParen, "`(`");
            self.builder.start_node(SyntaxKind::ArgList.into());
            while !self.at(SyntaxKind::RParen) && self.peek().is_some() {
                self.parse_arg();
                if self.at(SyntaxKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
            self.builder.finish_node();
            self.expect(SyntaxKind::RParen, "`)`");
            self.builder.finish_node();
        }
        self.builder.finish_node();
    }

    fn parse_arg(&mut self) {
        // Per spec §9's whitelisted action-argument grammar: identifier,
        // integer literal, string literal, or a single `fn(x)` call.
        match self.peek() {
            Some(SyntaxKind::Ident) => {
                self.bump();
                if self.at(SyntaxKind::LParen) {
                    self.bump();
                    if matches!(self.peek(), Some(SyntaxKind::Ident)) {
                        self.bump();
                    }
                    self.expect(SyntaxKind::RParen, "`)`");
                }
            }
            Some(SyntaxKind::Int) | Some(SyntaxKind::String) => {
                self.bump();
            }
            _ => {
                self.error_at(
                    self.fetch().map(|t| t.span).unwrap_or_default(),
                    "expected an identifier, number, string, or `fn(x)` call",
                );
            }
        }
    }

    fn parse_guard(&mut self) {
        self.builder.start_node(SyntaxKind::Guard.into());
        self.bump(); // 'check'
        self.skip_trivia();
        self.sync_for_raw_capture();
        let cond = self.lexer.capture_until_keyword(&["then"], false);
        self.builder
            .token(cond.kind.into(), self.source[cond.span.clone()].trim());

        self.expect(SyntaxKind::ThenKw, "`then`");
        self.skip_trivia();
        self.sync_for_raw_capture();
        let stmt = self.lexer.capture_until_keyword(&["else", "end"], true);
        self.builder
            .token(stmt.kind.into(), self.source[stmt.span.clone()].trim());

        self.skip_trivia();
        if self.at(SyntaxKind::ElseKw) {
            self.bump();
            self.expect(SyntaxKind::ThenKw, "`then`");
            self.skip_trivia();
            self.sync_for_raw_capture();
            let else_stmt = self.lexer.capture_until_keyword(&["end"], true);
            self.builder.token(
                else_stmt.kind.into(),
                self.source[else_stmt.span.clone()].trim(),
            );
        }
        self.builder.finish_node();
    }

    fn parse_test_block(&mut self) {
        self.builder.start_node(SyntaxKind::TestBlock.into());
        self.bump(); // 'test'
        self.expect(SyntaxKind::Ident, "a test suite name");
        if self.at(SyntaxKind::Ident) {
            self.bump(); // optional target rule name
        }
        self.expect(SyntaxKind::Colon, "`:`");

        loop {
            match self.peek() {
                Some(SyntaxKind::String) => self.parse_test_case(),
                Some(SyntaxKind::EndKw) => {
                    self.bump();
                    break;
                }
                None => break,
                Some(_) => {
                    self.error_at(
                        self.fetch().map(|t| t.span).unwrap_or_default(),
                        "expected a test input string or `end`",
                    );
                    self.recover_to_top_level();
                    break;
                }
            }
        }
        self.builder.finish_node();
    }

    fn parse_test_case(&mut self) {
        self.builder.start_node(SyntaxKind::TestCase.into());
        self.bump(); // input string
        self.expect(SyntaxKind::FatArrow, "`=>`");

        match self.peek() {
            Some(SyntaxKind::Ident) => {
                self.bump(); // Success | Fail | Yields
                if self.at(SyntaxKind::LParen) {
                    self.bump();
                    self.parse_yields_pattern();
                    self.expect(SyntaxKind::RParen, "`)`");
                }
            }
            _ => {
                self.error_at(
                    self.fetch().map(|t| t.span).unwrap_or_default(),
                    "expected `Success`, `Fail`, or `Yields(...)`",
                );
            }
        }
        self.builder.finish_node();
    }

    fn parse_yields_pattern(&mut self) {
        self.builder.start_node(SyntaxKind::YieldsPattern.into());
        if self.at(SyntaxKind::DotDotDot) {
            self.bump();
        } else if matches!(self.peek(), Some(SyntaxKind::Ident)) {
            self.bump(); // constructor name
            if self.at(SyntaxKind::LParen) {
                self.bump();
                loop {
                    match self.peek() {
                        Some(SyntaxKind::RParen) | None => break,
                        Some(SyntaxKind::DotDotDot) => {
                            self.bump();
                        }
                        // A nested `Name(args)` constructor argument: recurse
                        // into a child `YieldsPattern` node rather than
                        // flattening its tokens into this one (the argument
                        // always starts with its own constructor identifier,
                        // never a bare `(`).
                        Some(SyntaxKind::Ident) => {
                            self.parse_yields_pattern();
                        }
                        Some(_) => {
                            self.bump();
                        }
                    }
                    if self.at(SyntaxKind::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(SyntaxKind::RParen, "`)`");
            }
        }
        self.builder.finish_node();
    }
}
