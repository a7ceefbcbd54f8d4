//! The code emitter (spec §4.E): renders a compiled, checked
//! [`apy_ast::model::Grammar`] plus a standalone copy of the parse runtime
//! into `<GrammarName>_parser.rs` source text.
//!
//! Emission never runs over an unchecked grammar — callers are expected to
//! have run [`apy_checker::check`] first and confirmed
//! [`apy_checker::CheckReport::is_valid`] (spec §7: "the emitter refuses to
//! run on any `SemanticError`"); this crate itself has no way to represent
//! "refuse to emit", so that gate lives at the CLI layer (`src/commands/build.rs`).

#![warn(missing_docs)]

mod nodes;
mod render;
mod template;

pub use render::Config;
pub use render::emit;

/// The file name a generated parser is written to (spec §4.E:
/// `<GrammarName>_parser.<ext>`; this emitter's target is Rust).
pub fn output_file_name(grammar_name: &str) -> String {
    format!("{grammar_name}_parser.rs")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> apy_ast::model::Grammar {
        let parsed = apy_grammar::parse(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let mut lowered = apy_ast::lower(&parsed.tree);
        assert!(lowered.diagnostics.is_empty(), "{:?}", lowered.diagnostics);
        let mut grammar = lowered.grammars.remove(0);
        let report = apy_checker::check(&mut grammar);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        grammar
    }

    #[test]
    fn output_file_name_matches_grammar_name() {
        assert_eq!(output_file_name("Calc"), "Calc_parser.rs");
    }

    #[test]
    fn emits_inline_literal_grammar() {
        let src = r#"
grammar Cond:
    start rule Stmt:
        | "if" Stmt "then" Stmt -> If(c, b)
        | NUMBER -> pass
    end

    tokens:
        NUMBER: [0-9]+
        WS: skip \s+
    end
end
"#;
        let grammar = compile(src);
        let source = emit(&grammar, Config::default());
        assert!(source.contains("pub struct If"));
        assert!(source.contains("__LIT_"));
    }
}
