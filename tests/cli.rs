//! End-to-end tests over the `check`/`test`/`build` subcommands (spec §8's
//! "Calculator basics" and "Determinism" scenarios), driven through the
//! library crate's command functions rather than spawning a subprocess.

use std::path::PathBuf;

use apy::commands::Common;
use apy::commands::build;
use apy::commands::check;
use apy::commands::test;

const CALC_GRAMMAR: &str = r#"
grammar Calc:
    tokens:
        NUMBER: [0-9]+
        PLUS: \+
        WS: skip \s+
    end

    start rule Expr:
        | l:Expr PLUS r:Term -> Add(l, r)
        | Term -> pass
    end

    rule Term:
        | n:NUMBER -> Num(int(n))
    end

    test Basics:
        "10 + 20" => Add(Num(10), Num(20))
        "1+2+3" => Add(Add(Num(1), Num(2)), Num(3))
    end
end
"#;

const UNDEFINED_REFERENCE_GRAMMAR: &str = r#"
grammar Broken:
    tokens:
        NUMBER: [0-9]+
    end

    start rule Expr:
        | Foo -> pass
    end

    rule Foe:
        | NUMBER -> pass
    end
end
"#;

fn write_grammar(dir: &tempfile::TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).unwrap();
    path
}

fn common(grammar: PathBuf) -> Common {
    Common {
        grammar,
        no_color: true,
        report_mode: None,
    }
}

#[test]
fn check_accepts_a_valid_calculator_grammar() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = write_grammar(&dir, "calc.apy", CALC_GRAMMAR);

    let code = check::check(check::Args { common: common(grammar) }).unwrap();
    assert_eq!(code, apy::ExitCode::Success);
}

#[test]
fn check_reports_grammar_errors_for_undefined_reference() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = write_grammar(&dir, "broken.apy", UNDEFINED_REFERENCE_GRAMMAR);

    let code = check::check(check::Args { common: common(grammar) }).unwrap();
    assert_eq!(code, apy::ExitCode::GrammarErrors);
}

#[test]
fn test_runs_embedded_cases_and_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = write_grammar(&dir, "calc.apy", CALC_GRAMMAR);

    let code = test::test(test::Args { common: common(grammar) }).unwrap();
    assert_eq!(code, apy::ExitCode::Success);
}

#[test]
fn build_emits_a_parser_file_and_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = write_grammar(&dir, "calc.apy", CALC_GRAMMAR);
    let out_dir = dir.path().join("out");

    let run = || {
        build::build(build::Args {
            common: common(grammar.clone()),
            output: Some(out_dir.clone()),
            no_tests: false,
            tests: false,
            no_recovery: false,
            dry_run: false,
        })
        .unwrap()
    };

    assert_eq!(run(), apy::ExitCode::Success);
    let first = std::fs::read_to_string(out_dir.join("Calc_parser.rs")).unwrap();
    assert!(first.contains("pub fn parse("));
    assert!(first.contains("pub fn parse_Expr("));

    assert_eq!(run(), apy::ExitCode::Success);
    let second = std::fs::read_to_string(out_dir.join("Calc_parser.rs")).unwrap();
    pretty_assertions::assert_eq!(first, second);
}

#[test]
fn build_tests_only_flag_skips_emission() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = write_grammar(&dir, "calc.apy", CALC_GRAMMAR);
    let out_dir = dir.path().join("out");

    let code = build::build(build::Args {
        common: common(grammar),
        output: Some(out_dir.clone()),
        no_tests: false,
        tests: true,
        no_recovery: false,
        dry_run: false,
    })
    .unwrap();

    assert_eq!(code, apy::ExitCode::Success);
    assert!(!out_dir.join("Calc_parser.rs").exists());
}

#[test]
fn build_no_recovery_omits_the_recovery_function_from_output() {
    let dir = tempfile::tempdir().unwrap();
    let grammar = write_grammar(&dir, "calc.apy", CALC_GRAMMAR);
    let out_dir = dir.path().join("out");

    let code = build::build(build::Args {
        common: common(grammar),
        output: Some(out_dir.clone()),
        no_tests: true,
        tests: false,
        no_recovery: true,
        dry_run: false,
    })
    .unwrap();

    assert_eq!(code, apy::ExitCode::Success);
    let source = std::fs::read_to_string(out_dir.join("Calc_parser.rs")).unwrap();
    assert!(!source.contains("fn recover_from"));
}
