//! The grammar-independent portion of every generated parser.
//!
//! Each constant here is spliced verbatim into the emitted source; only
//! [`crate::render`] produces the grammar-dependent pieces (the AST node
//! declarations, the token/rule literals, and the per-rule dispatch
//! functions). Keeping the two halves textually separate is what makes
//! emission deterministic (spec §4.E: "byte-for-byte output given the same
//! input grammar and flags") — the static half never changes.
//!
//! The algorithm below is a self-contained copy of `apy-runtime`'s engine
//! (packrat memoization, ordered choice, repetition, bindings, actions,
//! seed-growing left recursion, panic-mode recovery), adapted to depend on
//! nothing but `regex` and `std`, since a generated parser must stand alone.

/// `Value`, the generic AST representation every generated parser returns
/// results in (mirrors `apy_runtime::value::Value`).
pub const VALUE: &str = r#"
/// A parsed AST value produced by matching a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The `pass` action's fallback when no binding or term value applies.
    Null,
    /// An integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string — matched token text or a string literal action argument.
    Str(String),
    /// A constructed AST node: `NodeName(arg1, ..., argN)`.
    Node {
        /// The constructor's tag.
        tag: &'static str,
        /// The evaluated argument list.
        args: Vec<Value>,
    },
    /// The result of a `*`/`+` repetition.
    List(Vec<Value>),
    /// A panic-mode recovery placeholder.
    ErrorNode,
}

impl Value {
    /// The `len(x)` built-in.
    pub fn len(&self) -> i64 {
        match self {
            Value::Str(s) => s.chars().count() as i64,
            Value::List(items) => items.len() as i64,
            _ => 0,
        }
    }

    /// The `int(x)` built-in.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Str(s) => s.trim().parse().unwrap_or(0),
            Value::Float(f) => *f as i64,
            _ => 0,
        }
    }

    /// The `float(x)` built-in.
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Float(f) => *f,
            Value::Int(n) => *n as f64,
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// The `str(x)` built-in.
    pub fn as_str_value(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Node { tag, args } => {
                write!(f, "{tag}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::ErrorNode => write!(f, "<error>"),
        }
    }
}
"#;

/// The compiled grammar's self-contained data model. Unlike
/// `apy_ast::model`, references are already resolved (this is emitted only
/// for a grammar that passed the semantic checker), so `Term::Rule`/
/// `Term::Token` hold a plain index rather than an `Option<ResolvedTarget>`.
pub const MODEL: &str = r#"
/// A repetition quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

/// An atomic match element within an [`Expression`].
#[derive(Debug, Clone)]
pub enum Term {
    /// Index into [`Grammar::rules`].
    Rule(usize),
    /// Index into [`Grammar::tokens`].
    Token(usize),
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
        name: &'static str,
        /// The bound term.
        base: Box<Term>,
    },
}

/// One argument to an [`Action::Constructor`] (spec §9's whitelisted action
/// argument grammar).
#[derive(Debug, Clone)]
pub enum ActionArg {
    /// A bare identifier, referring to a binding.
    Ident(&'static str),
    /// An integer literal.
    Int(i64),
    /// A string literal.
    Str(&'static str),
    /// `fn(x)` where `fn` is one of `int`, `float`, `str`, `len`.
    Call {
        /// The built-in function name.
        func: &'static str,
        /// The single argument identifier.
        arg: &'static str,
    },
}

/// What an [`Expression`] returns on success.
#[derive(Debug, Clone)]
pub enum Action {
    /// `NodeName(arg1, ..., argN)`.
    Constructor {
        /// The constructed AST node's tag.
        name: &'static str,
        /// The argument expressions.
        args: Vec<ActionArg>,
    },
    /// `pass`.
    Pass,
}

/// An optional post-match guard. `condition`/`then_branch`/`else_branch`
/// carry the grammar author's fragment text byte-for-byte (spec §4.E:
/// "Emit guard code verbatim"); [`GRAMMAR_GUARD_EVAL`] interprets them with
/// the same whitelisted expression grammar the checker and test runner use
/// (spec §9, design note: "restrict them to a small whitelisted expression
/// grammar... that the emitter can translate per target").
#[derive(Debug, Clone)]
pub struct CheckGuard {
    /// The opaque condition fragment.
    pub condition: &'static str,
    /// The opaque `then`-branch fragment.
    pub then_branch: &'static str,
    /// The opaque `else`-branch fragment, if present.
    pub else_branch: Option<&'static str>,
}

/// One alternative of a [`Rule`].
#[derive(Debug, Clone)]
pub struct Expression {
    /// The sequence of terms that must all match, in order.
    pub terms: Vec<Term>,
    /// What to return when the term sequence matches.
    pub action: Action,
    /// An optional post-match guard.
    pub guard: Option<CheckGuard>,
}

/// A named parsing procedure.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The rule's name.
    pub name: &'static str,
    /// The rule's alternatives, tried in declaration order.
    pub expressions: Vec<Expression>,
    /// Whether this rule requires seed-growing left-recursion support.
    pub left_recursive: bool,
}

/// An entry in the lexer table.
#[derive(Debug, Clone)]
pub struct TokenDef {
    /// The token's name.
    pub name: &'static str,
    /// The token's pattern, in `regex` syntax.
    pub pattern: &'static str,
    /// Whether matches are consumed but not emitted.
    pub skip: bool,
    /// Whether this token was synthesized from an inline string literal
    /// rather than declared explicitly — needed so a bare (unbound) literal
    /// term is excluded from a `pass` action's "single non-literal term"
    /// rule, exactly as `Reference::Literal` is excluded in the checker's
    /// own model.
    pub is_literal: bool,
}

/// The compiled grammar this parser was generated from.
#[derive(Debug, Clone)]
pub struct Grammar {
    /// The grammar's name.
    pub name: &'static str,
    /// The lexer table, in declaration order.
    pub tokens: Vec<TokenDef>,
    /// The rule table, in declaration order.
    pub rules: Vec<Rule>,
    /// The index, into `rules`, of the start rule.
    pub start_rule: usize,
    /// Token names recognized as panic-mode synchronization points,
    /// derived statically at emission time (spec §4.D: "Synchronization
    /// tokens are derived statically during emission").
    pub sync_tokens: &'static [&'static str],
}
"#;

/// The lexer driver (mirrors `apy_runtime::lexer`).
pub const LEXER: &str = r#"
/// A compiled lexer table entry.
struct CompiledToken {
    name: &'static str,
    regex: regex::Regex,
    skip: bool,
}

/// One token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The matched token's name, or `"<error>"` for a synthetic error token.
    pub name: String,
    /// The matched text.
    pub text: String,
    /// 1-based line of the match's start.
    pub line: usize,
    /// 1-based column of the match's start.
    pub column: usize,
    /// Whether this is a synthetic error token.
    pub is_error: bool,
}

/// An error produced while lexing: a zero-length token match at `line`,
/// `column`.
#[derive(Debug, Clone)]
pub struct LexError {
    /// A human-readable description.
    pub message: String,
    /// 1-based line of the failure.
    pub line: usize,
    /// 1-based column of the failure.
    pub column: usize,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

fn compile_tokens(grammar: &Grammar) -> Result<Vec<CompiledToken>, LexError> {
    grammar
        .tokens
        .iter()
        .map(|token| {
            let anchored = format!("^(?:{})", token.pattern);
            regex::Regex::new(&anchored)
                .map(|regex| CompiledToken {
                    name: token.name,
                    regex,
                    skip: token.skip,
                })
                .map_err(|source| LexError {
                    message: format!("token `{}` has an invalid pattern: {source}", token.name),
                    line: 1,
                    column: 1,
                })
        })
        .collect()
}

fn lex(input: &str, tokens: &[CompiledToken]) -> Result<Vec<Token>, LexError> {
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
                        message: format!("token `{}` matched a zero-length string", tok.name),
                        line,
                        column: col,
                    });
                }
                if !tok.skip {
                    out.push(Token {
                        name: tok.name.to_string(),
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
                out.push(Token {
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
"#;

/// The whitelisted guard-fragment evaluator (a textual copy of
/// `apy_testrunner::MiniGuardEval`'s expression grammar: identifier, int,
/// float, string literal, `+ - * / % == != < <= > >= && ||`, and the
/// `int`/`float`/`str`/`len` built-in calls), so a guard fragment behaves
/// identically whether it runs in-process under the test runner or inside
/// the emitted parser.
pub const GUARD_EVAL: &str = r#"
type Bindings = std::collections::HashMap<String, Value>;

enum GuardOutcome {
    Value(Value),
    Error(String),
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::ErrorNode => false,
        Value::Int(n) => *n != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Node { .. } | Value::List(_) => true,
    }
}

fn eval_condition(condition: &str, bindings: &Bindings, v: &Value) -> bool {
    eval_expr(condition, bindings, v).map(|value| truthy(&value)).unwrap_or(false)
}

fn eval_statement(statement: &str, bindings: &Bindings, v: &Value) -> GuardOutcome {
    let trimmed = statement.trim();
    if trimmed.is_empty() || trimmed == "pass" {
        return GuardOutcome::Value(v.clone());
    }
    if let Some(message) = parse_error_call(trimmed, bindings, v) {
        return GuardOutcome::Error(message);
    }
    match eval_expr(trimmed, bindings, v) {
        Ok(value) => GuardOutcome::Value(value),
        Err(_) => GuardOutcome::Value(v.clone()),
    }
}

fn parse_error_call(statement: &str, bindings: &Bindings, v: &Value) -> Option<String> {
    let rest = statement.strip_prefix("error(")?.strip_suffix(')')?;
    let value = eval_expr(rest.trim(), bindings, v).ok()?;
    Some(value.as_str_value())
}

#[derive(Debug, Clone, PartialEq)]
enum GToken {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<GToken>, ()> {
    let mut chars = src.char_indices().peekable();
    let mut tokens = Vec::new();
    while let Some(&(i, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        match ch {
            '(' => {
                chars.next();
                tokens.push(GToken::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(GToken::RParen);
            }
            '"' | '\'' => {
                let quote = ch;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, c)) => text.push(c),
                        None => return Err(()),
                    }
                }
                tokens.push(GToken::Str(text));
            }
            '0'..='9' => {
                let start = i;
                let mut end = i + ch.len_utf8();
                let mut is_float = false;
                chars.next();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        end = j + c.len_utf8();
                        chars.next();
                    } else if c == '.' && !is_float {
                        is_float = true;
                        end = j + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &src[start..end];
                if is_float {
                    tokens.push(GToken::Float(text.parse().map_err(|_| ())?));
                } else {
                    tokens.push(GToken::Int(text.parse().map_err(|_| ())?));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                let mut end = i + c.len_utf8();
                chars.next();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        end = j + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(GToken::Ident(src[start..end].to_string()));
            }
            '=' | '!' | '<' | '>' | '&' | '|' => {
                let two: String = src[i..].chars().take(2).collect();
                let op = match two.as_str() {
                    "==" | "!=" | "<=" | ">=" | "&&" | "||" => {
                        chars.next();
                        chars.next();
                        match two.as_str() {
                            "==" => "==",
                            "!=" => "!=",
                            "<=" => "<=",
                            ">=" => ">=",
                            "&&" => "&&",
                            "||" => "||",
                            _ => unreachable!(),
                        }
                    }
                    _ => {
                        chars.next();
                        match ch {
                            '<' => "<",
                            '>' => ">",
                            _ => return Err(()),
                        }
                    }
                };
                tokens.push(GToken::Op(op));
            }
            '+' | '-' | '*' | '/' | '%' => {
                chars.next();
                tokens.push(GToken::Op(match ch {
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    '/' => "/",
                    '%' => "%",
                    _ => unreachable!(),
                }));
            }
            ',' => {
                chars.next();
            }
            _ => return Err(()),
        }
    }
    Ok(tokens)
}

struct GParser<'a> {
    tokens: &'a [GToken],
    pos: usize,
    bindings: &'a Bindings,
    v: &'a Value,
}

impl<'a> GParser<'a> {
    fn peek(&self) -> Option<&GToken> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&GToken> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn parse_or(&mut self) -> Result<Value, ()> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(GToken::Op("||"))) {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Value::Int((truthy(&lhs) || truthy(&rhs)) as i64);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Value, ()> {
        let mut lhs = self.parse_cmp()?;
        while matches!(self.peek(), Some(GToken::Op("&&"))) {
            self.bump();
            let rhs = self.parse_cmp()?;
            lhs = Value::Int((truthy(&lhs) && truthy(&rhs)) as i64);
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Value, ()> {
        let lhs = self.parse_add()?;
        if let Some(GToken::Op(op)) = self.peek() {
            if matches!(*op, "==" | "!=" | "<" | "<=" | ">" | ">=") {
                let op = *op;
                self.bump();
                let rhs = self.parse_add()?;
                return Ok(Value::Int(compare(&lhs, &rhs, op)? as i64));
            }
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Value, ()> {
        let mut lhs = self.parse_mul()?;
        loop {
            match self.peek() {
                Some(GToken::Op(op @ ("+" | "-"))) => {
                    let op = *op;
                    self.bump();
                    let rhs = self.parse_mul()?;
                    lhs = arith(&lhs, &rhs, op)?;
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Value, ()> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(GToken::Op(op @ ("*" | "/" | "%"))) => {
                    let op = *op;
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = arith(&lhs, &rhs, op)?;
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Value, ()> {
        match self.peek() {
            Some(GToken::Op("-")) => {
                self.bump();
                let value = self.parse_unary()?;
                arith(&Value::Int(0), &value, "-")
            }
            Some(GToken::Op("!")) => {
                self.bump();
                let value = self.parse_unary()?;
                Ok(Value::Int(!truthy(&value) as i64))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Value, ()> {
        match self.bump().cloned() {
            Some(GToken::Int(n)) => Ok(Value::Int(n)),
            Some(GToken::Float(f)) => Ok(Value::Float(f)),
            Some(GToken::Str(s)) => Ok(Value::Str(s)),
            Some(GToken::LParen) => {
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(GToken::RParen) => Ok(inner),
                    _ => Err(()),
                }
            }
            Some(GToken::Ident(name)) => {
                if matches!(self.peek(), Some(GToken::LParen)) {
                    self.bump();
                    let arg = self.parse_or()?;
                    match self.bump() {
                        Some(GToken::RParen) => {}
                        _ => return Err(()),
                    }
                    return Ok(match name.as_str() {
                        "int" => Value::Int(arg.as_int()),
                        "float" => Value::Float(arg.as_float()),
                        "str" => Value::Str(arg.as_str_value()),
                        "len" => Value::Int(arg.len()),
                        _ => arg,
                    });
                }
                if name == "v" {
                    return Ok(self.v.clone());
                }
                if name == "true" {
                    return Ok(Value::Int(1));
                }
                if name == "false" {
                    return Ok(Value::Int(0));
                }
                Ok(self.bindings.get(&name).cloned().unwrap_or(Value::Null))
            }
            _ => Err(()),
        }
    }
}

fn eval_expr(src: &str, bindings: &Bindings, v: &Value) -> Result<Value, ()> {
    let tokens = tokenize(src)?;
    let mut parser = GParser { tokens: &tokens, pos: 0, bindings, v };
    let result = parser.parse_or()?;
    if parser.pos != tokens.len() {
        return Err(());
    }
    Ok(result)
}

fn is_float_value(value: &Value) -> bool {
    matches!(value, Value::Float(_))
}

fn arith(lhs: &Value, rhs: &Value, op: &str) -> Result<Value, ()> {
    if op == "+" && (matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_))) {
        return Ok(Value::Str(format!("{lhs}{rhs}")));
    }
    if is_float_value(lhs) || is_float_value(rhs) {
        let a = lhs.as_float();
        let b = rhs.as_float();
        return Ok(Value::Float(match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" => a / b,
            "%" => a % b,
            _ => return Err(()),
        }));
    }
    let a = lhs.as_int();
    let b = rhs.as_int();
    Ok(Value::Int(match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b != 0 => a / b,
        "/" => 0,
        "%" if b != 0 => a % b,
        "%" => 0,
        _ => return Err(()),
    }))
}

fn compare(lhs: &Value, rhs: &Value, op: &str) -> Result<bool, ()> {
    let ordering = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ if is_float_value(lhs) || is_float_value(rhs) => {
            lhs.as_float().partial_cmp(&rhs.as_float()).ok_or(())?
        }
        _ => lhs.as_int().cmp(&rhs.as_int()),
    };
    Ok(match op {
        "==" => ordering == std::cmp::Ordering::Equal,
        "!=" => ordering != std::cmp::Ordering::Equal,
        "<" => ordering == std::cmp::Ordering::Less,
        "<=" => ordering != std::cmp::Ordering::Greater,
        ">" => ordering == std::cmp::Ordering::Greater,
        ">=" => ordering != std::cmp::Ordering::Less,
        _ => return Err(()),
    })
}
"#;

/// The packrat parser core and public `ParseResult`/`ParseError` types.
/// Mirrors `apy_runtime::parser`/`apy_runtime::lib` almost exactly; the
/// differences are self-containment (no `apy_ast`/`apy_runtime` dependency)
/// and the guard seam being a pair of free functions
/// (`eval_condition`/`eval_statement` from [`GUARD_EVAL`]) rather than a
/// `dyn GuardEval` trait object, since a generated parser has exactly one
/// guard evaluator and no need for the test runner's pluggability.
///
/// [`crate::render::render_parser_engine`] assembles the final text from
/// [`PARSER_HEADER`] + ([`RECOVERY_BRANCH_ON`] or [`RECOVERY_BRANCH_OFF`],
/// selected by the `--no-recovery` flag) + [`PARSER_FOOTER`] +
/// [`RECOVER_FROM`] (only when recovery is enabled) — this is the "omitting
/// the synchronization path" spec §4.E requires, not a runtime toggle.
pub const PARSER_HEADER: &str = r#"
/// A recoverable error recorded during a parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// A human-readable description, including any guard-raised message.
    pub message: String,
    /// 1-based line of the error.
    pub line: usize,
    /// 1-based column of the error.
    pub column: usize,
}

/// The outcome of a parse.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The resulting AST, or [`Value::Null`] if the start rule never
    /// matched at all.
    pub ast: Value,
    /// Every error recorded during the parse, in the order encountered.
    pub errors: Vec<ParseError>,
    /// The full token stream the parser consumed from.
    pub tokens: Vec<Token>,
    /// `errors.is_empty()`.
    pub is_valid: bool,
}

#[derive(Debug, Clone)]
enum MemoEntry {
    Success { value: Value, end: usize },
    Failure,
}

impl MemoEntry {
    fn end(&self) -> Option<usize> {
        match self {
            MemoEntry::Success { end, .. } => Some(*end),
            MemoEntry::Failure => None,
        }
    }
}

struct GrowState {
    seed: MemoEntry,
}

struct ParseState<'a> {
    tokens: &'a [Token],
    memo: std::collections::HashMap<(usize, usize), MemoEntry>,
    growing: std::collections::HashMap<(usize, usize), GrowState>,
    errors: Vec<ParseError>,
    furthest_failure: usize,
}

impl<'a> ParseState<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            memo: std::collections::HashMap::new(),
            growing: std::collections::HashMap::new(),
            errors: Vec::new(),
            furthest_failure: 0,
        }
    }

    fn match_rule(&mut self, grammar: &Grammar, id: usize, pos: usize) -> MemoEntry {
        if let Some(cached) = self.memo.get(&(id, pos)) {
            return cached.clone();
        }
        if grammar.rules[id].left_recursive {
            return self.match_rule_left_recursive(grammar, id, pos);
        }
        let result = self.match_rule_alts(grammar, id, pos);
        self.memo.insert((id, pos), result.clone());
        result
    }

    fn match_rule_left_recursive(&mut self, grammar: &Grammar, id: usize, pos: usize) -> MemoEntry {
        if let Some(state) = self.growing.get(&(id, pos)) {
            return state.seed.clone();
        }
        self.growing.insert((id, pos), GrowState { seed: MemoEntry::Failure });
        loop {
            let attempt = self.match_rule_alts(grammar, id, pos);
            let seed_end = self.growing[&(id, pos)].seed.end();
            let grew = match (attempt.end(), seed_end) {
                (Some(new_end), Some(old_end)) => new_end > old_end,
                (Some(_), None) => true,
                _ => false,
            };
            if grew {
                self.growing.get_mut(&(id, pos)).unwrap().seed = attempt;
                continue;
            }
            break;
        }
        let final_seed = self.growing.remove(&(id, pos)).unwrap().seed;
        self.memo.insert((id, pos), final_seed.clone());
        final_seed
    }

    fn match_rule_alts(&mut self, grammar: &Grammar, id: usize, pos: usize) -> MemoEntry {
        let rule = &grammar.rules[id];
        'alts: for expr in &rule.expressions {
            let mut bindings: Bindings = Bindings::new();
            let mut cur = pos;
            let mut values = Vec::with_capacity(expr.terms.len());
            let mut matched = true;
            for term in &expr.terms {
                match self.match_term(grammar, cur, term, &mut bindings) {
                    Some((value, end)) => {
                        values.push(value);
                        cur = end;
                    }
                    None => {
                        matched = false;
                        break;
                    }
                }
            }

            if !matched {
                self.furthest_failure = self.furthest_failure.max(cur);
                continue;
            }

            let action_value = self.eval_action(grammar, &expr.action, &bindings, &expr.terms, &values);

            let final_value = match &expr.guard {
                None => action_value,
                Some(guard) => {
                    let cond = eval_condition(guard.condition, &bindings, &action_value);
                    let statement = if cond {
                        Some(guard.then_branch)
                    } else {
                        guard.else_branch
                    };
                    match statement {
                        None => action_value,
                        Some(stmt) => match eval_statement(stmt, &bindings, &action_value) {
                            GuardOutcome::Value(v) => v,
                            GuardOutcome::Error(message) => {
                                let (line, column) = self.pos_line_col(cur);
                                self.errors.push(ParseError { message, line, column });
                                continue 'alts;
                            }
                        },
                    }
                }
            };

            return MemoEntry::Success { value: final_value, end: cur };
        }

        self.furthest_failure = self.furthest_failure.max(pos);
        MemoEntry::Failure
    }

    fn match_term(
        &mut self,
        grammar: &Grammar,
        pos: usize,
        term: &Term,
        bindings: &mut Bindings,
    ) -> Option<(Value, usize)> {
        match term {
            Term::Rule(id) => match self.match_rule(grammar, *id, pos) {
                MemoEntry::Success { value, end } => Some((value, end)),
                MemoEntry::Failure => None,
            },
            Term::Token(id) => self.match_token_name(&grammar.tokens[*id].name, pos),
            Term::Binding { name, base } => {
                let (value, end) = self.match_term(grammar, pos, base, bindings)?;
                bindings.insert((*name).to_string(), value.clone());
                Some((value, end))
            }
            Term::Repetition { base, quantifier } => {
                self.match_repetition(grammar, pos, base, *quantifier, bindings)
            }
        }
    }

    fn match_token_name(&self, name: &str, pos: usize) -> Option<(Value, usize)> {
        let tok = self.tokens.get(pos)?;
        if tok.is_error || tok.name != name {
            return None;
        }
        Some((Value::Str(tok.text.clone()), pos + 1))
    }

    fn match_repetition(
        &mut self,
        grammar: &Grammar,
        pos: usize,
        base: &Term,
        quantifier: Quantifier,
        bindings: &mut Bindings,
    ) -> Option<(Value, usize)> {
        if quantifier == Quantifier::Optional {
            return match self.match_term(grammar, pos, base, bindings) {
                Some((value, end)) => Some((value, end)),
                None => Some((Value::Null, pos)),
            };
        }

        let mut items = Vec::new();
        let mut cur = pos;
        loop {
            match self.match_term(grammar, cur, base, bindings) {
                Some((value, end)) => {
                    let zero_width = end == cur;
                    items.push(value);
                    cur = end;
                    if zero_width {
                        break;
                    }
                }
                None => {
"#;

/// Spliced into the repetition-failure branch when recovery is enabled.
pub const RECOVERY_BRANCH_ON: &str = r#"
                    if cur < self.tokens.len() {
                        if let Some(recovered) = self.recover_from(grammar, cur) {
                            items.push(Value::ErrorNode);
                            cur = recovered;
                            continue;
                        }
                    }
                    break;
"#;

/// Spliced into the repetition-failure branch under `--no-recovery`: the
/// first failure is terminal, no synchronization is attempted.
pub const RECOVERY_BRANCH_OFF: &str = r#"
                    break;
"#;

/// The remainder of `ParseState`'s impl block, shared by both variants.
pub const PARSER_FOOTER: &str = r#"
                }
            }
        }

        if quantifier == Quantifier::OneOrMore && items.is_empty() {
            return None;
        }
        Some((Value::List(items), cur))
    }

    fn pos_line_col(&self, pos: usize) -> (usize, usize) {
        if let Some(tok) = self.tokens.get(pos) {
            (tok.line, tok.column)
        } else if let Some(last) = self.tokens.last() {
            (last.line, last.column + last.text.chars().count())
        } else {
            (1, 1)
        }
    }

    fn eval_action(&self, grammar: &Grammar, action: &Action, bindings: &Bindings, terms: &[Term], values: &[Value]) -> Value {
        match action {
            Action::Pass => {
                if bindings.len() == 1 {
                    return bindings.values().next().cloned().unwrap_or(Value::Null);
                }
                let mut non_literal = terms
                    .iter()
                    .zip(values.iter())
                    .filter(|(term, _)| !is_literal_term(grammar, term))
                    .map(|(_, value)| value.clone());
                match (non_literal.next(), non_literal.next()) {
                    (Some(only), None) => only,
                    _ => Value::Null,
                }
            }
            Action::Constructor { name, args } => {
                let evaluated = args.iter().map(|arg| self.eval_arg(arg, bindings)).collect();
                Value::Node { tag: name, args: evaluated }
            }
        }
    }

    fn eval_arg(&self, arg: &ActionArg, bindings: &Bindings) -> Value {
        match arg {
            ActionArg::Ident(name) => bindings.get(*name).cloned().unwrap_or(Value::Null),
            ActionArg::Int(n) => Value::Int(*n),
            ActionArg::Str(s) => Value::Str((*s).to_string()),
            ActionArg::Call { func, arg } => {
                let value = bindings.get(*arg).cloned().unwrap_or(Value::Null);
                match *func {
                    "int" => Value::Int(value.as_int()),
                    "float" => Value::Float(value.as_float()),
                    "str" => Value::Str(value.as_str_value()),
                    "len" => Value::Int(value.len()),
                    _ => value,
                }
            }
        }
    }
}

fn is_literal_term(grammar: &Grammar, term: &Term) -> bool {
    match term {
        Term::Token(id) => grammar.tokens[*id].is_literal,
        Term::Rule(_) => false,
        Term::Binding { base, .. } | Term::Repetition { base, .. } => is_literal_term(grammar, base),
    }
}
"#;

/// Recovery-path helper appended only when `--no-recovery` was not passed.
pub const RECOVER_FROM: &str = r#"
impl<'a> ParseState<'a> {
    fn recover_from(&mut self, grammar: &Grammar, pos: usize) -> Option<usize> {
        let (line, column) = self.pos_line_col(pos);
        self.errors.push(ParseError {
            message: format!("unexpected `{}`; attempting to resynchronize", self.tokens[pos].text),
            line,
            column,
        });
        let mut i = pos;
        while i < self.tokens.len() {
            if grammar.sync_tokens.contains(&self.tokens[i].name.as_str()) {
                return Some(i + 1);
            }
            i += 1;
        }
        if i > pos { Some(i) } else { None }
    }
}
"#;
