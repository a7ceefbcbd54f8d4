//! The `.apy` lexer.
//!
//! Lexing is split into two modes. Most of a grammar file tokenizes with an
//! ordinary [`logos`] automaton (keywords, punctuation, identifiers, quoted
//! literals). Token *patterns* inside a `tokens:` block are different: per
//! spec, `PATTERN` extends to the end of the line and its text (including
//! embedded whitespace) is taken literally. Those lines are captured by
//! [`Lexer::capture_pattern_line`], which bypasses the token automaton
//! entirely, so the parser is responsible for switching modes at the right
//! point (right after `NAME:` or `NAME: skip` in a `tokens:` block).

use std::ops::Range;

use logos::Logos;

use crate::syntax::SyntaxKind;

/// The raw token kinds produced by the structural lexer.
///
/// These map one-to-one onto the leaf [`SyntaxKind`]s except for
/// [`SyntaxKind::Pattern`], which is never produced here.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum RawToken {
    /// A comment, `#` to end of line.
    #[regex(r"#[^\n]*")]
    Comment,

    #[token("grammar")]
    Grammar,
    #[token("end")]
    End,
    #[token("tokens")]
    Tokens,
    #[token("rule")]
    Rule,
    #[token("start")]
    Start,
    #[token("test")]
    Test,
    #[token("skip")]
    Skip,
    #[token("check")]
    Check,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("pass")]
    Pass,

    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token(":")]
    Colon,
    #[token("|")]
    Pipe,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("...")]
    DotDotDot,

    /// A single- or double-quoted string literal. A doubled quote character
    /// (`""` / `''`) is the only supported escape; the first unmatched quote
    /// of the opening kind ends the literal.
    #[regex(r#""([^"]|"")*""#)]
    #[regex(r"'([^']|'')*'")]
    String,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

impl RawToken {
    /// Converts this raw token kind into its [`SyntaxKind`].
    pub fn into_syntax(self) -> SyntaxKind {
        match self {
            RawToken::Comment => SyntaxKind::Comment,
            RawToken::Grammar => SyntaxKind::GrammarKw,
            RawToken::End => SyntaxKind::EndKw,
            RawToken::Tokens => SyntaxKind::TokensKw,
            RawToken::Rule => SyntaxKind::RuleKw,
            RawToken::Start => SyntaxKind::StartKw,
            RawToken::Test => SyntaxKind::TestKw,
            RawToken::Skip => SyntaxKind::SkipKw,
            RawToken::Check => SyntaxKind::CheckKw,
            RawToken::Then => SyntaxKind::ThenKw,
            RawToken::Else => SyntaxKind::ElseKw,
            RawToken::Pass => SyntaxKind::PassKw,
            RawToken::Arrow => SyntaxKind::Arrow,
            RawToken::FatArrow => SyntaxKind::FatArrow,
            RawToken::Colon => SyntaxKind::Colon,
            RawToken::Pipe => SyntaxKind::Pipe,
            RawToken::Question => SyntaxKind::Question,
            RawToken::Star => SyntaxKind::Star,
            RawToken::Plus => SyntaxKind::Plus,
            RawToken::LParen => SyntaxKind::LParen,
            RawToken::RParen => SyntaxKind::RParen,
            RawToken::Comma => SyntaxKind::Comma,
            RawToken::DotDotDot => SyntaxKind::DotDotDot,
            RawToken::String => SyntaxKind::String,
            RawToken::Int => SyntaxKind::Int,
            RawToken::Ident => SyntaxKind::Ident,
        }
    }
}

/// A lexed token: its kind, byte span in the source, and whether it is
/// trivia (whitespace/comment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexedToken {
    /// The kind of the token.
    pub kind: SyntaxKind,
    /// The byte span of the token in the source.
    pub span: Range<usize>,
}

/// The `.apy` lexer.
///
/// Produces one [`LexedToken`] at a time from the current byte offset. Trivia
/// (comments and whitespace) is returned like any other token: it is up to
/// the parser to fold it into the tree as trivia rather than discarding it.
#[derive(Debug)]
pub struct Lexer<'a> {
    /// The full source text.
    source: &'a str,
    /// The current byte offset into `source`.
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Constructs a new lexer over `source`, starting at the beginning.
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// The current byte offset.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Resets the lexer to the given byte offset.
    pub fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    /// Returns the full source text.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Produces the next token, or `None` at end of input.
    ///
    /// On a lexical error (no raw token matches at `self.pos`), returns a
    /// single-byte (or single UTF-8 scalar) [`SyntaxKind::Unknown`] token so
    /// the parser can synchronize, per spec's `ErrorToken` synthesis rule.
    pub fn next(&mut self) -> Option<LexedToken> {
        if self.pos >= self.source.len() {
            return None;
        }

        let slice = &self.source[self.pos..];
        let mut inner = RawToken::lexer(slice);
        match inner.next() {
            Some(Ok(tok)) => {
                let span = inner.span();
                let start = self.pos + span.start;
                let end = self.pos + span.end;
                self.pos = end;
                Some(LexedToken {
                    kind: tok.into_syntax(),
                    span: start..end,
                })
            }
            Some(Err(())) | None => {
                let len = slice.chars().next().map(|c| c.len_utf8()).unwrap_or(1);
                let start = self.pos;
                let end = start + len;
                self.pos = end;
                Some(LexedToken {
                    kind: SyntaxKind::Unknown,
                    span: start..end,
                })
            }
        }
    }

    /// Captures the rest of the current line verbatim, starting at
    /// `self.pos`, as a [`SyntaxKind::Pattern`] token.
    ///
    /// Used for token pattern declarations (`NAME: PATTERN` / `NAME: skip
    /// PATTERN`), where the text is taken literally to end of line rather
    /// than tokenized. The trailing newline (if any) is not included.
    pub fn capture_pattern_line(&mut self) -> LexedToken {
        let start = self.pos;
        let rest = &self.source[self.pos..];
        let len = rest.find('\n').unwrap_or(rest.len());
        let mut end = start + len;
        // Trim trailing carriage return / whitespace so the pattern text
        // doesn't absorb line-ending noise.
        while end > start && matches!(self.source.as_bytes()[end - 1], b'\r' | b' ' | b'\t') {
            end -= 1;
        }
        self.pos = start + len;
        LexedToken {
            kind: SyntaxKind::Pattern,
            span: start..end,
        }
    }

    /// Captures raw text from `self.pos` up to (but not including) the first
    /// standalone occurrence of one of `keywords`, or a newline if
    /// `stop_at_newline` is set and one is found first.
    ///
    /// Used for `check`-guard condition/statement fragments, which are
    /// opaque host-language text per spec and must not be tokenized. The
    /// terminating keyword or newline itself is left unconsumed.
    pub fn capture_until_keyword(&mut self, keywords: &[&str], stop_at_newline: bool) -> LexedToken {
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let is_word = |c: u8| c.is_ascii_alphanumeric() || c == b'_';

        let mut i = start;
        let mut end = bytes.len();
        while i < bytes.len() {
            if stop_at_newline && bytes[i] == b'\n' {
                end = i;
                break;
            }

            let at_word_start = i == start || !is_word(bytes[i - 1]);
            if at_word_start {
                let found = keywords.iter().any(|kw| {
                    let kw_len = kw.len();
                    i + kw_len <= bytes.len()
                        && &self.source[i..i + kw_len] == *kw
                        && (i + kw_len == bytes.len() || !is_word(bytes[i + kw_len]))
                });
                if found {
                    end = i;
                    break;
                }
            }

            i += 1;
        }

        let mut trimmed_end = end;
        while trimmed_end > start
            && self.source.as_bytes()[trimmed_end - 1].is_ascii_whitespace()
        {
            trimmed_end -= 1;
        }

        self.pos = end;
        LexedToken {
            kind: SyntaxKind::Pattern,
            span: start..trimmed_end,
        }
    }
}

/// Computes the 1-based `(line, column)` of a byte offset in `source`.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let mut line = 1;
    let mut col = 1;
    for ch in source[..offset].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Unescapes a quoted literal's text (including its surrounding quotes),
/// collapsing doubled quote characters into a single one.
pub fn unescape_quoted(text: &str) -> String {
    let quote = text.chars().next().unwrap_or('"');
    let inner = &text[1..text.len().saturating_sub(1)];
    let doubled: String = std::iter::repeat_n(quote, 2).collect();
    inner.replace(&doubled, &quote.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_keywords_and_punctuation() {
        let mut lexer = Lexer::new("grammar Foo: end");
        let kinds: Vec<_> = std::iter::from_fn(|| lexer.next())
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::GrammarKw,
                SyntaxKind::Ident,
                SyntaxKind::Colon,
                SyntaxKind::EndKw,
            ]
        );
    }

    #[test]
    fn unknown_token_advances_one_char() {
        let mut lexer = Lexer::new("@@ foo");
        let first = lexer.next().unwrap();
        assert_eq!(first.kind, SyntaxKind::Unknown);
        assert_eq!(&"@@ foo"[first.span.clone()], "@");
    }

    #[test]
    fn captures_pattern_to_end_of_line() {
        let src = "NUMBER: \\d+  \ntokens";
        let mut lexer = Lexer::new(src);
        lexer.next(); // NUMBER
        lexer.next(); // :
        // skip the single space after the colon the way the parser would
        lexer.seek(lexer.offset() + 1);
        let pat = lexer.capture_pattern_line();
        assert_eq!(&src[pat.span.clone()], "\\d+");
    }

    #[test]
    fn unescapes_doubled_quotes() {
        assert_eq!(unescape_quoted(r#""he said ""hi""""#), r#"he said "hi""#);
        assert_eq!(unescape_quoted("'it''s'"), "it's");
    }
}
