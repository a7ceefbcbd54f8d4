//! The generated parser's lexer driver (spec §4.D, "Lexer").
//!
//! Operates over a [`Grammar`]'s compiled token table. Tokens are tried in
//! declaration order at each position — first match wins, there is no
//! "longest match across tokens" rule, since PEG ordering governs (spec:
//! "No 'longest match across tokens' rule").

use apy_ast::model::Grammar;
use regex::Regex;
use thiserror::Error;

/// A compiled lexer table entry.
pub struct CompiledToken {
    /// The token's name (or, for a synthetic literal, its generated name).
    pub name: String,
    /// The token's pattern, anchored to match only at the start of the
    /// remaining input.
    pub regex: Regex,
    /// Whether matches of this token are consumed but not emitted.
    pub skip: bool,
}

/// An error compiling a [`Grammar`]'s token table.
#[derive(Debug, Error)]
pub enum LexerError {
    /// A token's pattern did not compile as a regular expression (spec §4.B:
    /// `InvalidTokenRegex` is a `SemanticError`, so in practice the checker
    /// should have already rejected this grammar; this variant exists for
    /// defense in depth when the runtime is driven directly).
    #[error("token `{name}` has an invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending token's name.
        name: String,
        /// The offending pattern text.
        pattern: String,
        /// The underlying regex compiler error.
        #[source]
        source: regex::Error,
    },
}

/// Compiles every token in `grammar`'s table, anchoring each pattern to the
/// start of the match position.
pub fn compile_tokens(grammar: &Grammar) -> Result<Vec<CompiledToken>, LexerError> {
    grammar
        .tokens
        .iter()
        .map(|token| {
            let anchored = format!("^(?:{})", token.pattern);
            Regex::new(&anchored)
                .map(|regex| CompiledToken {
                    name: token.name.clone(),
                    regex,
                    skip: token.skip,
                })
                .map_err(|source| LexerError::InvalidPattern {
                    name: token.name.clone(),
                    pattern: token.pattern.clone(),
                    source,
                })
        })
        .collect()
}

/// One token produced by the lexer. `is_error` marks a synthetic
/// `ErrorToken` inserted where no table entry matched.
#[derive(Debug, Clone, PartialEq)]
pub struct LexedToken {
    /// The matched token's name, or `"<error>"` for a synthetic error
    /// token.
    pub name: String,
    /// The matched text.
    pub text: String,
    /// 1-based line of the match's start.
    pub line: usize,
    /// 1-based column of the match's start.
    pub column: usize,
    /// Whether this is a synthetic `ErrorToken` (spec §4.D step 5).
    pub is_error: bool,
}

/// An error produced while lexing (spec §4.D: a zero-length match is fatal;
/// this never happens for a no-match, which instead synthesizes an
/// `ErrorToken`).
#[derive(Debug, Error)]
#[error("token `{token}` matched a zero-length string at line {line}, column {column}")]
pub struct LexError {
    /// The offending token's name.
    pub token: String,
    /// 1-based line of the zero-length match.
    pub line: usize,
    /// 1-based column of the zero-length match.
    pub column: usize,
}

/// Lexes `input` against `tokens`, returning the stream of non-`skip`
/// tokens the parser will see (spec: "Skip tokens are consumed but not
/// passed to the parser").
pub fn lex(input: &str, tokens: &[CompiledToken]) -> Result<Vec<LexedToken>, LexError> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    let (mut line, mut col) = (1usize, 1usize);

    while pos < input.len() {
        let slice = &input[pos..];
        let mut matched = None;
        for tok in tokens {
            if let Some(m) = tok.regex.find(slice) {
                if m.start() == 0 {
                    matched = Some((tok, m.as_str()));
                    break;
                }
            }
        }

        match matched {
            Some((tok, text)) => {
                if text.is_empty() {
                    return Err(LexError {
                        token: tok.name.clone(),
                        line,
                        column: col,
                    });
                }
                if !tok.skip {
                    out.push(LexedToken {
                        name: tok.name.clone(),
                        text: text.to_string(),
                        line,
                        column: col,
                        is_error: false,
                    });
                }
                advance(text, &mut pos, &mut line, &mut col);
            }
            None => {
                let ch_len = slice.chars().next().map(|c| c.len_utf8()).unwrap_or(1);
                let text = &slice[..ch_len];
                out.push(LexedToken {
                    name: "<error>".to_string(),
                    text: text.to_string(),
                    line,
                    column: col,
                    is_error: true,
                });
                advance(text, &mut pos, &mut line, &mut col);
            }
        }
    }

    Ok(out)
}

fn advance(text: &str, pos: &mut usize, line: &mut usize, col: &mut usize) {
    for ch in text.chars() {
        if ch == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    }
    *pos += text.len();
}
