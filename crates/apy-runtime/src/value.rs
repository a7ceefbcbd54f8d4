//! Runtime values produced by actions (spec §4.D, "Action evaluation").

use std::fmt;

/// An AST value produced by matching a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The `pass` action's fallback when no binding or term value applies.
    Null,
    /// An integer, from an `int` literal/conversion or a matched token's
    /// text parsed via the `int(x)` built-in.
    Int(i64),
    /// A floating-point number, from the `float(x)` built-in.
    Float(f64),
    /// A string — either matched token text, a string literal action
    /// argument, or the `str(x)` built-in's result.
    Str(String),
    /// A constructed AST node: `NodeName(arg1, ..., argN)`.
    Node {
        /// The constructor's tag.
        tag: String,
        /// The evaluated argument list.
        args: Vec<Value>,
    },
    /// The result of a `*`/`+` repetition: the list of per-iteration
    /// values.
    List(Vec<Value>),
    /// A panic-mode recovery placeholder, inserted where a repetition
    /// iteration failed and the parser resynchronized past it (spec §4.D,
    /// "treating the failed rule as having produced an `ErrorNode`").
    ErrorNode,
}

impl Value {
    /// The `len(x)` built-in: the length of a string or list value.
    pub fn len(&self) -> i64 {
        match self {
            Value::Str(s) => s.chars().count() as i64,
            Value::List(items) => items.len() as i64,
            _ => 0,
        }
    }

    /// The `int(x)` built-in: parses a string value as an integer,
    /// passes through an existing integer, and otherwise yields `0`.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Str(s) => s.trim().parse().unwrap_or(0),
            Value::Float(f) => *f as i64,
            _ => 0,
        }
    }

    /// The `float(x)` built-in, analogous to [`Value::as_int`].
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Float(f) => *f,
            Value::Int(n) => *n as f64,
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// The `str(x)` built-in: a textual rendering of this value.
    pub fn as_str_value(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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
