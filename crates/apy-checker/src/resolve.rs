//! Duplicate detection, token pattern validation, start-rule resolution,
//! and reference resolution (spec §4.B, passes 1–3; token pattern
//! validation is spec §3's Token invariant "pattern compiles", fatal per
//! spec §7 item 3 "invalid token regex").

use std::collections::HashMap;

use apy_ast::Diagnostic;
use apy_ast::model::Grammar;
use indexmap::IndexMap;
use apy_ast::model::Reference;
use apy_ast::model::ResolvedTarget;
use apy_ast::model::Term;
use apy_ast::model::Token;

/// Runs duplicate detection, token pattern validation, start-rule
/// resolution, and reference resolution over `grammar`, mutating it in
/// place (synthetic tokens are appended, `Reference::Named::resolved` and
/// `Reference::Literal::token` are filled in) and appending diagnostics to
/// `errors`/`warnings`.
pub fn resolve(grammar: &mut Grammar, errors: &mut Vec<Diagnostic>, warnings: &mut Vec<Diagnostic>) {
    detect_duplicates(grammar, errors);
    validate_token_patterns(grammar, errors);
    resolve_start_rule(grammar, errors, warnings);
    resolve_references(grammar, errors);
}

fn detect_duplicates(grammar: &Grammar, errors: &mut Vec<Diagnostic>) {
    // `IndexMap` (rather than `HashMap`) keeps "first definition wins"
    // duplicate reporting in source order, which matters when a name is
    // redefined more than twice.
    let mut seen_tokens: IndexMap<&str, usize> = IndexMap::new();
    for (i, token) in grammar.tokens.iter().enumerate() {
        if seen_tokens.insert(token.name.as_str(), i).is_some() {
            errors.push(
                Diagnostic::error()
                    .with_message(format!("duplicate token definition `{}`", token.name)),
            );
        }
    }

    let mut seen_rules: IndexMap<&str, usize> = IndexMap::new();
    for (i, rule) in grammar.rules.iter().enumerate() {
        if seen_rules.insert(rule.name.as_str(), i).is_some() {
            errors.push(
                Diagnostic::error().with_message(format!("duplicate rule definition `{}`", rule.name)),
            );
        }
    }
}

/// Confirms every user-declared token's `pattern` compiles as a regex
/// (spec §3's Token invariant). Synthetic tokens are skipped: their
/// pattern is always `regex_escape`d from literal text by [`resolve_references`]
/// and so is trivially valid, and it hasn't been spliced in yet when this
/// runs.
fn validate_token_patterns(grammar: &Grammar, errors: &mut Vec<Diagnostic>) {
    for token in &grammar.tokens {
        if token.synthetic_literal.is_some() {
            continue;
        }
        if let Err(e) = regex::Regex::new(&token.pattern) {
            errors.push(Diagnostic::error().with_message(format!(
                "token `{}` has an invalid pattern `{}`: {e}",
                token.name, token.pattern
            )));
        }
    }
}

fn resolve_start_rule(grammar: &mut Grammar, errors: &mut Vec<Diagnostic>, warnings: &mut Vec<Diagnostic>) {
    let explicit_count = grammar.rules.iter().filter(|r| r.is_start).count();
    if explicit_count > 1 {
        errors.push(
            Diagnostic::error()
                .with_message("multiple rules marked `start`; a grammar may have only one"),
        );
    } else if explicit_count == 0 && !grammar.rules.is_empty() {
        warnings.push(
            Diagnostic::warning().with_message(format!(
                "no rule marked `start`; implicitly using the first rule `{}`",
                grammar.rules[0].name
            )),
        );
    }
}

/// Resolves every `Reference::Named`/`Reference::Literal` term in `grammar`
/// against its rule and token tables, reporting `UndefinedReference` errors
/// with a Levenshtein-nearest suggestion (spec §4.B.3) and promoting inline
/// literals to de-duplicated synthetic tokens (spec §3, "Literal"; spec
/// §9's synthetic-token ordering).
fn resolve_references(grammar: &mut Grammar, errors: &mut Vec<Diagnostic>) {
    let rule_names: Vec<String> = grammar.rules.iter().map(|r| r.name.clone()).collect();
    let token_names: Vec<String> = grammar.tokens.iter().map(|t| t.name.clone()).collect();

    let mut synthetic_by_text: HashMap<String, u32> = HashMap::new();
    // Pre-seed with any existing synthetic tokens so re-running resolution
    // (e.g. after an incremental edit) stays idempotent.
    for (i, tok) in grammar.tokens.iter().enumerate() {
        if let Some(text) = &tok.synthetic_literal {
            synthetic_by_text.insert(text.clone(), i as u32);
        }
    }

    let mut new_tokens: Vec<Token> = Vec::new();

    for rule in &mut grammar.rules {
        for expr in &mut rule.expressions {
            for term in &mut expr.terms {
                resolve_term(
                    term,
                    &rule_names,
                    &token_names,
                    &mut synthetic_by_text,
                    &mut new_tokens,
                    errors,
                );
            }
        }
    }

    // Synthetic tokens are inserted ahead of user-declared tokens (spec §9:
    // "synthetics inserted at the top of the table... but before broad
    // ones"), since a generated keyword-like literal token should win
    // ordered-choice ties against a broader identifier token.
    let offset = new_tokens.len() as u32;
    if offset > 0 {
        let mut combined = new_tokens;
        combined.append(&mut grammar.tokens);
        grammar.tokens = combined;

        // Literal terms' TokenId values were assigned as indices into
        // `new_tokens` directly, which *is* their final front-of-table
        // index once spliced in — they need no shift. A `Named` reference
        // that resolved to `ResolvedTarget::Token(j)`, though, was resolved
        // against the *pre-insertion* user-token table, so its index is now
        // off by `offset` now that synthetic tokens sit in front of it.
        for rule in &mut grammar.rules {
            for expr in &mut rule.expressions {
                for term in &mut expr.terms {
                    shift_named_token_ids(term, offset);
                }
            }
        }
    }
}

fn resolve_term(
    term: &mut Term,
    rule_names: &[String],
    token_names: &[String],
    synthetic_by_text: &mut HashMap<String, u32>,
    new_tokens: &mut Vec<Token>,
    errors: &mut Vec<Diagnostic>,
) {
    match term {
        Term::Reference(reference) => resolve_reference(
            reference,
            rule_names,
            token_names,
            synthetic_by_text,
            new_tokens,
            errors,
        ),
        Term::Repetition { base, .. } | Term::Binding { base, .. } => {
            resolve_term(base, rule_names, token_names, synthetic_by_text, new_tokens, errors)
        }
    }
}

fn resolve_reference(
    reference: &mut Reference,
    rule_names: &[String],
    token_names: &[String],
    synthetic_by_text: &mut HashMap<String, u32>,
    new_tokens: &mut Vec<Token>,
    errors: &mut Vec<Diagnostic>,
) {
    match reference {
        Reference::Named { name, resolved } => {
            if let Some(i) = rule_names.iter().position(|r| r == name) {
                *resolved = Some(ResolvedTarget::Rule(apy_ast::model::RuleId(i as u32)));
            } else if let Some(i) = token_names.iter().position(|t| t == name) {
                *resolved = Some(ResolvedTarget::Token(apy_ast::model::TokenId(i as u32)));
            } else {
                let suggestion = nearest_name(name, rule_names.iter().chain(token_names.iter()));
                let message = match suggestion {
                    Some(s) => format!("Undefined reference '{name}'; did you mean '{s}'?"),
                    None => format!("Undefined reference '{name}'"),
                };
                errors.push(Diagnostic::error().with_message(message));
            }
        }
        Reference::Literal { text, token } => {
            // Local index in `new_tokens` if this literal hasn't been seen
            // yet; resolved against the final spliced table afterward.
            let local_id = if let Some(&existing) = synthetic_by_text.get(text) {
                existing
            } else {
                let id = new_tokens.len() as u32;
                new_tokens.push(Token {
                    name: format!("__LIT_{id}"),
                    pattern: regex_escape(text),
                    skip: false,
                    synthetic_literal: Some(text.clone()),
                });
                synthetic_by_text.insert(text.clone(), id);
                id
            };
            *token = Some(apy_ast::model::TokenId(local_id));
        }
    }
}

fn shift_named_token_ids(term: &mut Term, offset: u32) {
    match term {
        Term::Reference(Reference::Named {
            resolved: Some(ResolvedTarget::Token(id)),
            ..
        }) => {
            id.0 += offset;
        }
        Term::Reference(_) => {}
        Term::Repetition { base, .. } | Term::Binding { base, .. } => {
            shift_named_token_ids(base, offset)
        }
    }
}

/// Escapes `text` for literal use inside a regular expression pattern.
fn regex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if "\\^$.|?*+()[]{}".contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Finds the closest name to `name` among `candidates` by Levenshtein
/// distance, per spec §4.B.3. Returns `None` if `candidates` is empty.
fn nearest_name<'a>(name: &str, candidates: impl Iterator<Item = &'a String>) -> Option<&'a str> {
    candidates
        .map(|c| (c.as_str(), strsim::levenshtein(name, c)))
        .min_by_key(|(_, dist)| *dist)
        .map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lowered(src: &str) -> Grammar {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let lowered = apy_ast::lower(&parsed.tree);
        assert!(lowered.diagnostics.is_empty(), "{:?}", lowered.diagnostics);
        lowered.grammars.into_iter().next().unwrap()
    }

    /// A grammar mixing inline literals (`"if"`/`"then"`) with a reference
    /// to a declared token (`NUMBER`), exercised end to end through
    /// [`resolve`] and then the resolved table itself — regression test for
    /// the synthetic-token splice corrupting ids when both kinds of
    /// reference are present (the literals' local `new_tokens` indices were
    /// being shifted a second time, and the named reference's original
    /// index was being left unshifted).
    #[test]
    fn mixed_literal_and_named_token_references_resolve_to_the_spliced_table() {
        let src = r#"
grammar Kw:
    tokens:
        NUMBER: [0-9]+
    end

    start rule Stmt:
        | "if" Stmt "then" Stmt -> If(c, b)
        | NUMBER -> pass
    end
end
"#;
        let mut grammar = lowered(src);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        resolve(&mut grammar, &mut errors, &mut warnings);
        assert!(errors.is_empty(), "{errors:?}");

        // Synthetic literals sit at the front of the table, at the same
        // indices their terms were assigned while being built.
        assert_eq!(grammar.tokens[0].synthetic_literal.as_deref(), Some("if"));
        assert_eq!(grammar.tokens[1].synthetic_literal.as_deref(), Some("then"));
        assert_eq!(grammar.tokens[2].name, "NUMBER");

        let first_alt = &grammar.rules[0].expressions[0].terms;
        assert!(matches!(
            &first_alt[0],
            Term::Reference(Reference::Literal { token: Some(id), .. }) if id.0 == 0
        ));
        assert!(matches!(
            &first_alt[2],
            Term::Reference(Reference::Literal { token: Some(id), .. }) if id.0 == 1
        ));

        let second_alt = &grammar.rules[0].expressions[1].terms;
        assert!(matches!(
            &second_alt[0],
            Term::Reference(Reference::Named {
                resolved: Some(ResolvedTarget::Token(id)),
                ..
            }) if id.0 == 2
        ));

        // Every resolved TokenId must be a valid index into the final,
        // spliced token table — this is what panicked before the fix.
        for rule in &grammar.rules {
            for expr in &rule.expressions {
                for term in &expr.terms {
                    assert_resolved_token_in_bounds(term, &grammar);
                }
            }
        }
    }

    fn assert_resolved_token_in_bounds(term: &Term, grammar: &Grammar) {
        match term {
            Term::Reference(Reference::Literal { token: Some(id), .. }) => {
                grammar.token(*id);
            }
            Term::Reference(Reference::Named {
                resolved: Some(ResolvedTarget::Token(id)),
                ..
            }) => {
                grammar.token(*id);
            }
            Term::Reference(_) => {}
            Term::Repetition { base, .. } | Term::Binding { base, .. } => {
                assert_resolved_token_in_bounds(base, grammar)
            }
        }
    }
}
