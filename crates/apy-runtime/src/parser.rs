//! The packrat parser core (spec §4.D, "Parser core").

use std::collections::HashMap;

use apy_ast::model::Action;
use apy_ast::model::ActionArg;
use apy_ast::model::Grammar;
use apy_ast::model::Quantifier;
use apy_ast::model::Reference;
use apy_ast::model::ResolvedTarget;
use apy_ast::model::RuleId;
use apy_ast::model::Term;

use crate::ParseError;
use crate::guard::Bindings;
use crate::guard::GuardEval;
use crate::guard::GuardOutcome;
use crate::lexer::LexedToken;
use crate::sync::SyncTokens;
use crate::value::Value;

/// A packrat memo table entry (spec §4.D, "Packrat memoization").
#[derive(Debug, Clone)]
pub(crate) enum MemoEntry {
    /// The rule matched, ending at token index `end`.
    Success {
        /// The rule's computed value.
        value: Value,
        /// The token index immediately after the match.
        end: usize,
    },
    /// The rule did not match at this position.
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

/// Per-rule, per-position left-recursion growing state (spec §4.D, "Left
/// recursion (seed-growing)"; spec §9, "Growing-seed state": removed on
/// rule exit to avoid cross-parse leakage — here that's simply not
/// inserting it into `memo`, since `ParseState` itself doesn't outlive one
/// parse).
struct GrowState {
    seed: MemoEntry,
}

/// All mutable state threaded through one parse.
pub(crate) struct ParseState<'a> {
    tokens: &'a [LexedToken],
    guard: &'a dyn GuardEval,
    enable_recovery: bool,
    sync_tokens: SyncTokens,
    memo: HashMap<(u32, usize), MemoEntry>,
    growing: HashMap<(u32, usize), GrowState>,
    pub(crate) errors: Vec<ParseError>,
    /// The furthest token index any rule failed at; used to place the
    /// "unexpected end of input" error when the whole parse fails without
    /// any guard/recovery error having been recorded.
    pub(crate) furthest_failure: usize,
}

impl<'a> ParseState<'a> {
    /// Builds a fresh parse state over an already-lexed token stream.
    pub(crate) fn new(
        tokens: &'a [LexedToken],
        guard: &'a dyn GuardEval,
        enable_recovery: bool,
        sync_tokens: SyncTokens,
    ) -> Self {
        Self {
            tokens,
            guard,
            enable_recovery,
            sync_tokens,
            memo: HashMap::new(),
            growing: HashMap::new(),
            errors: Vec::new(),
            furthest_failure: 0,
        }
    }

    /// Matches rule `id` at token position `pos`, consulting (and updating)
    /// the packrat memo table, and running the seed-growing loop if `id` is
    /// left-recursive.
    pub(crate) fn match_rule(&mut self, grammar: &Grammar, id: RuleId, pos: usize) -> MemoEntry {
        if let Some(cached) = self.memo.get(&(id.0, pos)) {
            return cached.clone();
        }

        if grammar.rule(id).left_recursive {
            return self.match_rule_left_recursive(grammar, id, pos);
        }

        let result = self.match_rule_alts(grammar, id, pos);
        self.memo.insert((id.0, pos), result.clone());
        result
    }

    fn match_rule_left_recursive(&mut self, grammar: &Grammar, id: RuleId, pos: usize) -> MemoEntry {
        if let Some(state) = self.growing.get(&(id.0, pos)) {
            return state.seed.clone();
        }

        self.growing.insert(
            (id.0, pos),
            GrowState {
                seed: MemoEntry::Failure,
            },
        );

        loop {
            let attempt = self.match_rule_alts(grammar, id, pos);
            let seed_end = self.growing[&(id.0, pos)].seed.end();
            let grew = match (attempt.end(), seed_end) {
                (Some(new_end), Some(old_end)) => new_end > old_end,
                (Some(_), None) => true,
                _ => false,
            };
            if grew {
                self.growing.get_mut(&(id.0, pos)).unwrap().seed = attempt;
                continue;
            }
            break;
        }

        let final_seed = self.growing.remove(&(id.0, pos)).unwrap().seed;
        self.memo.insert((id.0, pos), final_seed.clone());
        final_seed
    }

    /// Tries each alternative of `id` in declaration order at `pos` (spec
    /// §4.D, "Ordered choice"), without consulting or updating the memo
    /// table (that's [`Self::match_rule`]'s job, so seed-growing can
    /// re-invoke this directly).
    fn match_rule_alts(&mut self, grammar: &Grammar, id: RuleId, pos: usize) -> MemoEntry {
        let rule = grammar.rule(id);
        'alts: for expr in &rule.expressions {
            let mut bindings = Bindings::new();
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

            let action_value = self.eval_action(&expr.action, &bindings, &expr.terms, &values);

            let final_value = match &expr.guard {
                None => action_value,
                Some(guard) => {
                    let cond = self.guard.eval_condition(&guard.condition, &bindings, &action_value);
                    let statement = if cond {
                        Some(guard.then_branch.as_str())
                    } else {
                        guard.else_branch.as_deref()
                    };
                    match statement {
                        None => action_value,
                        Some(stmt) => match self.guard.eval_statement(stmt, &bindings, &action_value) {
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

            return MemoEntry::Success {
                value: final_value,
                end: cur,
            };
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
            Term::Reference(Reference::Named {
                resolved: Some(ResolvedTarget::Rule(id)),
                ..
            }) => match self.match_rule(grammar, *id, pos) {
                MemoEntry::Success { value, end } => Some((value, end)),
                MemoEntry::Failure => None,
            },
            Term::Reference(Reference::Named {
                resolved: Some(ResolvedTarget::Token(id)),
                ..
            }) => self.match_token_name(&grammar.token(*id).name, pos),
            Term::Reference(Reference::Literal { token: Some(id), .. }) => {
                self.match_token_name(&grammar.token(*id).name, pos)
            }
            // An unresolved reference can only reach the runtime if the
            // checker was bypassed; treat it as a permanent failure rather
            // than panicking.
            Term::Reference(Reference::Named { resolved: None, .. })
            | Term::Reference(Reference::Literal { token: None, .. }) => None,
            Term::Binding { name, base } => {
                let (value, end) = self.match_term(grammar, pos, base, bindings)?;
                bindings.insert(name.clone(), value.clone());
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

    /// Matches `base` under a quantifier (spec §4.D, "Repetition and
    /// optional"). For `*`/`+`, a failed iteration attempts panic-mode
    /// recovery (spec §4.D, "Error recovery") when enabled, synchronizing
    /// to the next sync token and recording an [`Value::ErrorNode`] in the
    /// resulting list rather than aborting the whole repetition.
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
                    // A zero-width match must terminate repetition after
                    // one iteration (spec §4.D: "if e matches empty,
                    // repetition terminates after one iteration").
                    let zero_width = end == cur;
                    items.push(value);
                    cur = end;
                    if zero_width {
                        break;
                    }
                }
                None => {
                    if self.enable_recovery && cur < self.tokens.len() {
                        if let Some(recovered) = self.recover_from(cur) {
                            items.push(Value::ErrorNode);
                            cur = recovered;
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        if quantifier == Quantifier::OneOrMore && items.is_empty() {
            return None;
        }
        Some((Value::List(items), cur))
    }

    /// Panic-mode recovery (spec §4.D, "Error recovery (Panic Mode)"):
    /// records a `ParseError` at `pos` and advances until a sync token is
    /// found (consuming it, so the caller resumes just after it) or end of
    /// input. Returns `None` if no progress at all could be made.
    fn recover_from(&mut self, pos: usize) -> Option<usize> {
        let (line, column) = self.pos_line_col(pos);
        self.errors.push(ParseError {
            message: format!(
                "unexpected `{}`; attempting to resynchronize",
                self.tokens[pos].text
            ),
            line,
            column,
        });

        let mut i = pos;
        while i < self.tokens.len() {
            if self.sync_tokens.contains(&self.tokens[i].name) {
                return Some(i + 1);
            }
            i += 1;
        }
        if i > pos { Some(i) } else { None }
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

    fn eval_action(&self, action: &Action, bindings: &Bindings, terms: &[Term], values: &[Value]) -> Value {
        match action {
            Action::Pass => {
                if bindings.len() == 1 {
                    return bindings.values().next().cloned().unwrap_or(Value::Null);
                }
                let mut non_literal = terms
                    .iter()
                    .zip(values.iter())
                    .filter(|(term, _)| !is_literal_term(term))
                    .map(|(_, value)| value.clone());
                match (non_literal.next(), non_literal.next()) {
                    (Some(only), None) => only,
                    _ => Value::Null,
                }
            }
            Action::Constructor { name, args } => {
                let evaluated = args.iter().map(|arg| self.eval_arg(arg, bindings)).collect();
                Value::Node {
                    tag: name.clone(),
                    args: evaluated,
                }
            }
        }
    }

    fn eval_arg(&self, arg: &ActionArg, bindings: &Bindings) -> Value {
        match arg {
            ActionArg::Ident(name) => bindings.get(name).cloned().unwrap_or(Value::Null),
            ActionArg::Int(n) => Value::Int(*n),
            ActionArg::Str(s) => Value::Str(s.clone()),
            ActionArg::Call { func, arg } => {
                let value = bindings.get(arg).cloned().unwrap_or(Value::Null);
                match func.as_str() {
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

fn is_literal_term(term: &Term) -> bool {
    match term {
        Term::Reference(Reference::Literal { .. }) => true,
        Term::Reference(Reference::Named { .. }) => false,
        Term::Binding { base, .. } | Term::Repetition { base, .. } => is_literal_term(base),
    }
}
