//! Renders a [`Grammar`] back to `.apy` textual form.
//!
//! Used by the round-trip testable property (spec §8): re-parsing this
//! output with [`crate::lower::lower`] must reproduce a structurally
//! equivalent `Grammar`. The renderer does not try to reproduce the
//! original's comments, whitespace, or token order beyond what the model
//! itself records — it is a canonical form, not a formatter.

use std::fmt;
use std::fmt::Write as _;

use crate::model::Action;
use crate::model::ActionArg;
use crate::model::Expectation;
use crate::model::Grammar;
use crate::model::Quantifier;
use crate::model::Reference;
use crate::model::Term;
use crate::model::YieldsPattern;

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grammar {}:", self.name)?;

        if !self.tokens.is_empty() {
            writeln!(f, "    tokens:")?;
            for token in &self.tokens {
                if token.skip {
                    writeln!(f, "        {}: skip {}", token.name, token.pattern)?;
                } else {
                    writeln!(f, "        {}: {}", token.name, token.pattern)?;
                }
            }
            writeln!(f, "    end")?;
            writeln!(f)?;
        }

        for rule in &self.rules {
            if rule.is_start {
                write!(f, "    start rule {}:", rule.name)?;
            } else {
                write!(f, "    rule {}:", rule.name)?;
            }
            writeln!(f)?;
            for expr in &rule.expressions {
                write!(f, "        |")?;
                for term in &expr.terms {
                    write!(f, " {}", TermDisplay(term))?;
                }
                write!(f, " -> {}", ActionDisplay(&expr.action))?;
                if let Some(guard) = &expr.guard {
                    write!(f, " check {} then {}", guard.condition, guard.then_branch)?;
                    if let Some(else_branch) = &guard.else_branch {
                        write!(f, " else then {else_branch}")?;
                    }
                }
                writeln!(f)?;
            }
            writeln!(f, "    end")?;
            writeln!(f)?;
        }

        for suite in &self.test_suites {
            match &suite.target_rule {
                Some(target) => writeln!(f, "    test {} {}:", suite.name, target)?,
                None => writeln!(f, "    test {}:", suite.name)?,
            }
            for case in &suite.cases {
                write!(f, "        \"{}\" => ", escape_for_double_quotes(&case.input))?;
                match &case.expectation {
                    Expectation::Success => writeln!(f, "Success")?,
                    Expectation::Fail => writeln!(f, "Fail")?,
                    Expectation::Yields(pattern) => writeln!(f, "Yields({})", PatternDisplay(pattern))?,
                }
            }
            writeln!(f, "    end")?;
            writeln!(f)?;
        }

        write!(f, "end")
    }
}

struct TermDisplay<'a>(&'a Term);

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Term::Reference(Reference::Named { name, .. }) => f.write_str(name),
            Term::Reference(Reference::Literal { text, .. }) => {
                write!(f, "'{}'", escape_for_single_quotes(text))
            }
            Term::Binding { name, base } => write!(f, "{name}:{}", TermDisplay(base)),
            Term::Repetition { base, quantifier } => write!(f, "{}{}", TermDisplay(base), quantifier),
        }
    }
}

struct ActionDisplay<'a>(&'a Action);

impl fmt::Display for ActionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Action::Pass => f.write_str("pass"),
            Action::Constructor { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match arg {
                        ActionArg::Ident(s) => f.write_str(s)?,
                        ActionArg::Int(n) => write!(f, "{n}")?,
                        ActionArg::Str(s) => write!(f, "\"{}\"", escape_for_double_quotes(s))?,
                        ActionArg::Call { func, arg } => write!(f, "{func}({arg})")?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}

struct PatternDisplay<'a>(&'a YieldsPattern);

impl fmt::Display for PatternDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            YieldsPattern::Wildcard => f.write_str("..."),
            YieldsPattern::Int(n) => write!(f, "{n}"),
            YieldsPattern::Str(s) => write!(f, "'{}'", escape_for_single_quotes(s)),
            YieldsPattern::Constructor { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", PatternDisplay(arg))?;
                }
                write!(f, ")")
            }
        }
    }
}

fn escape_for_double_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '"' {
            let _ = write!(out, "\"\"");
        } else {
            out.push(ch);
        }
    }
    out
}

fn escape_for_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\'' {
            let _ = write!(out, "''");
        } else {
            out.push(ch);
        }
    }
    out
}
