//! An in-process interpreter for guard fragments (spec §9, "Dynamic
//! host-language fragments"; [`apy_runtime::GuardEval`]).
//!
//! Guard condition/statement text is an opaque string as far as the front
//! end and checker are concerned. Running a grammar's own tests, though,
//! means actually exercising that text, so this crate supplies a small
//! pattern-matched expression evaluator over the whitelisted grammar spec §9
//! allows for action arguments, extended with arithmetic and comparison
//! operators — enough to cover the guard fragments a grammar author would
//! plausibly write, without pretending to be a full host-language
//! interpreter. The code emitter takes the other approach: it copies guard
//! text verbatim into the generated Rust, where the real compiler judges it.

use apy_runtime::Bindings;
use apy_runtime::GuardEval;
use apy_runtime::GuardOutcome;
use apy_runtime::Value;

/// The [`GuardEval`] used while running a grammar's embedded tests.
pub struct MiniGuardEval;

impl GuardEval for MiniGuardEval {
    fn eval_condition(&self, condition: &str, bindings: &Bindings, v: &Value) -> bool {
        eval_expr(condition, bindings, v).map(|value| truthy(&value)).unwrap_or(false)
    }

    fn eval_statement(&self, statement: &str, bindings: &Bindings, v: &Value) -> GuardOutcome {
        let trimmed = statement.trim();
        if trimmed.is_empty() || trimmed == "pass" {
            return GuardOutcome::Value(v.clone());
        }
        if let Some(message) = parse_error_call(trimmed, bindings, v) {
            return GuardOutcome::Error(message);
        }
        match eval_expr(trimmed, bindings, v) {
            Ok(value) => GuardOutcome::Value(value),
            // A statement this evaluator can't parse is treated as a no-op
            // pass-through rather than a hard failure; the code emitter is
            // the implementation of record for fragments this small
            // evaluator doesn't cover.
            Err(_) => GuardOutcome::Value(v.clone()),
        }
    }
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

/// Recognizes an `error("message")` call, evaluating `message` as an
/// expression (so `error(reason)` referring to a bound string also works).
fn parse_error_call(statement: &str, bindings: &Bindings, v: &Value) -> Option<String> {
    let rest = statement.strip_prefix("error(")?.strip_suffix(')')?;
    let value = eval_expr(rest.trim(), bindings, v).ok()?;
    Some(value.as_str_value())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ()> {
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
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
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
                tokens.push(Token::Str(text));
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
                    tokens.push(Token::Float(text.parse().map_err(|_| ())?));
                } else {
                    tokens.push(Token::Int(text.parse().map_err(|_| ())?));
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
                tokens.push(Token::Ident(src[start..end].to_string()));
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
                tokens.push(Token::Op(op));
            }
            '+' | '-' | '*' | '/' | '%' => {
                chars.next();
                tokens.push(Token::Op(match ch {
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

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    bindings: &'a Bindings,
    v: &'a Value,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn parse_or(&mut self) -> Result<Value, ()> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Op("||"))) {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Value::Int((truthy(&lhs) || truthy(&rhs)) as i64);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Value, ()> {
        let mut lhs = self.parse_cmp()?;
        while matches!(self.peek(), Some(Token::Op("&&"))) {
            self.bump();
            let rhs = self.parse_cmp()?;
            lhs = Value::Int((truthy(&lhs) && truthy(&rhs)) as i64);
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Value, ()> {
        let lhs = self.parse_add()?;
        if let Some(Token::Op(op)) = self.peek() {
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
                Some(Token::Op(op @ ("+" | "-"))) => {
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
                Some(Token::Op(op @ ("*" | "/" | "%"))) => {
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
            Some(Token::Op("-")) => {
                self.bump();
                let value = self.parse_unary()?;
                arith(&Value::Int(0), &value, "-")
            }
            Some(Token::Op("!")) => {
                self.bump();
                let value = self.parse_unary()?;
                Ok(Value::Int(!truthy(&value) as i64))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Value, ()> {
        match self.bump().cloned() {
            Some(Token::Int(n)) => Ok(Value::Int(n)),
            Some(Token::Float(f)) => Ok(Value::Float(f)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(()),
                }
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.bump();
                    let arg = self.parse_or()?;
                    match self.bump() {
                        Some(Token::RParen) => {}
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
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        bindings,
        v,
    };
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
        _ if is_float_value(lhs) || is_float_value(rhs) => lhs
            .as_float()
            .partial_cmp(&rhs.as_float())
            .ok_or(())?,
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn evaluates_arithmetic_and_comparison() {
        let bindings: Bindings = HashMap::new();
        let v = Value::Null;
        assert_eq!(eval_expr("1 + 2 * 3", &bindings, &v), Ok(Value::Int(7)));
        assert_eq!(eval_expr("10 > 3 && 1 == 1", &bindings, &v), Ok(Value::Int(1)));
    }

    #[test]
    fn guard_condition_reads_bindings() {
        let mut bindings: Bindings = HashMap::new();
        bindings.insert("n".to_string(), Value::Int(5));
        let eval = MiniGuardEval;
        assert!(eval.eval_condition("n > 0", &bindings, &Value::Null));
        assert!(!eval.eval_condition("n > 10", &bindings, &Value::Null));
    }

    #[test]
    fn error_call_produces_error_outcome() {
        let bindings: Bindings = HashMap::new();
        let eval = MiniGuardEval;
        match eval.eval_statement("error(\"bad value\")", &bindings, &Value::Null) {
            GuardOutcome::Error(message) => assert_eq!(message, "bad value"),
            other => panic!("expected an error outcome, got {other:?}"),
        }
    }
}
