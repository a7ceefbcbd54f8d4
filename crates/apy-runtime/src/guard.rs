//! The seam between the generic runtime and a `CheckGuard`'s opaque
//! host-language fragments (spec §9, "Dynamic host-language fragments").
//!
//! The runtime never interprets a guard's `COND`/`STMT` text itself — it
//! delegates to a [`GuardEval`] supplied by the caller. `apy-testrunner`
//! supplies an in-process mini-evaluator so grammar-embedded tests with
//! guards are actually exercised; the code emitter instead copies guard
//! text verbatim into the generated Rust source.

use std::collections::HashMap;

use crate::value::Value;

/// The binding scope visible to a guard: every `name:term` bound so far in
/// the current alternative, plus `v`, the action's computed value.
pub type Bindings = HashMap<String, Value>;

/// What evaluating a guard's `then`/`else` statement fragment produced.
#[derive(Debug, Clone)]
pub enum GuardOutcome {
    /// The statement completed normally, yielding this value (typically
    /// `v` unchanged, for a `pass`-shaped statement).
    Value(Value),
    /// The statement invoked `error(msg)`: the alternative is converted to
    /// a failure carrying `msg` (spec §4.D: "the alternative is converted
    /// to a failure with msg attached for diagnostics").
    Error(String),
}

/// Evaluates the opaque condition/statement fragments of a `CheckGuard`.
pub trait GuardEval {
    /// Evaluates `condition` in the given binding scope (with `v` bound to
    /// the action's computed value), returning its truth value.
    fn eval_condition(&self, condition: &str, bindings: &Bindings, v: &Value) -> bool;

    /// Evaluates a `then`/`else` statement fragment.
    fn eval_statement(&self, statement: &str, bindings: &Bindings, v: &Value) -> GuardOutcome;
}

/// A [`GuardEval`] that treats every condition as `true` and every
/// statement as a no-op pass-through of `v`. Used where a caller has no
/// need to exercise guard semantics (e.g. a dry structural parse check).
pub struct NoopGuardEval;

impl GuardEval for NoopGuardEval {
    fn eval_condition(&self, _condition: &str, _bindings: &Bindings, _v: &Value) -> bool {
        true
    }

    fn eval_statement(&self, _statement: &str, _bindings: &Bindings, v: &Value) -> GuardOutcome {
        GuardOutcome::Value(v.clone())
    }
}
