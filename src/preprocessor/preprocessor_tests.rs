use super::*;
use crate::codegen::{Architecture, OperatingSystem};
use crate::session::Define;

fn session() -> Session {
    Session::new(Architecture::X86, OperatingSystem::Linux)
}

fn run_with(session: &Session, source: &str) -> Result<TokenList> {
    let mut list = lex(source, "test.c", LexMode::Preprocessor, session.max_string)?;
    let mut env = base_environment(session);
    preprocess(&mut list, &mut env, session)?;
    strip_newlines(&mut list);
    Ok(list)
}

fn texts(source: &str) -> Vec<String> {
    let list = run_with(&session(), source).unwrap();
    list.texts().into_iter().map(str::to_owned).collect()
}

fn error(source: &str) -> String {
    run_with(&session(), source).unwrap_err().to_string()
}

#[test]
fn object_macros_substitute_at_use_sites() {
    assert_eq!(texts("#define FOO 42\nint x = FOO;\n"), ["int", "x", "=", "42", ";"]);
}

#[test]
fn empty_macro_expands_to_nothing() {
    assert_eq!(texts("#define NOTHING\na NOTHING b\n"), ["a", "b"]);
}

#[test]
fn substitution_expands_nested_macros() {
    assert_eq!(texts("#define A B C\n#define B 1\nA\n"), ["1", "C"]);
}

#[test]
fn self_referential_macro_stays_literal() {
    assert_eq!(texts("#define LOOP LOOP\nLOOP\n"), ["LOOP"]);
}

#[test]
fn mutually_recursive_macros_terminate() {
    // the depth cap leaves whichever name it bottomed out on
    assert_eq!(texts("#define A B\n#define B A\nA\n"), ["B"]);
}

#[test]
fn undef_removes_a_definition() {
    assert_eq!(texts("#define X 1\n#undef X\nX\n"), ["X"]);
}

#[test]
fn ifdef_selects_on_definition() {
    assert_eq!(texts("#define ON\n#ifdef ON\nkept\n#endif\ndropped?\n#ifdef OFF\ngone\n#endif\n"),
        ["kept", "dropped", "?"]);
    assert_eq!(texts("#ifndef OFF\nkept\n#endif\n"), ["kept"]);
}

#[test]
fn else_branch_runs_when_condition_fails() {
    assert_eq!(texts("#ifdef OFF\na\n#else\nb\n#endif\n"), ["b"]);
    assert_eq!(texts("#ifdef __M2__\na\n#else\nb\n#endif\n"), ["a"]);
}

#[test]
fn elif_chain_takes_first_true_branch() {
    let source = "#if 0\na\n#elif 1\nb\n#elif 1\nc\n#else\nd\n#endif\n";
    assert_eq!(texts(source), ["b"]);
}

#[test]
fn conditionals_nest() {
    let source = "#ifdef __M2__\n#ifdef OFF\nx\n#else\ny\n#endif\n#endif\n";
    assert_eq!(texts(source), ["y"]);
}

#[test]
fn suppressed_regions_do_not_define_or_error() {
    let source = "#if 0\n#define HIDDEN 1\n#error never fires\n#endif\nHIDDEN\n";
    assert_eq!(texts(source), ["HIDDEN"]);
}

#[test]
fn if_expressions_use_defined_and_macros() {
    assert_eq!(texts("#if defined(__M2__) && ! defined(OFF)\nok\n#endif\n"), ["ok"]);
    assert_eq!(texts("#define A B\n#define B 1\n#if A\nok\n#endif\n"), ["ok"]);
    // unknown identifiers evaluate as zero
    assert_eq!(texts("#if MYSTERY\nno\n#else\nyes\n#endif\n"), ["yes"]);
}

#[test]
fn architecture_presets_are_predefined() {
    assert_eq!(texts("#ifdef __i386__\nx86\n#endif\n#ifdef __linux__\nlinux\n#endif\n"),
        ["x86", "linux"]);
    let mut riscv = session();
    riscv.arch = Architecture::Riscv64;
    let list = run_with(&riscv, "#if __riscv_xlen && defined(__riscv)\nrv\n#endif\n").unwrap();
    assert_eq!(list.texts(), ["rv"]);
}

#[test]
fn command_line_defines_land_in_the_environment() {
    let mut sess = session();
    sess.defines.push(Define::parse("LIMIT=9"));
    sess.defines.push(Define::parse("FLAG"));
    let list = run_with(&sess, "LIMIT\n#ifdef FLAG\nset\n#endif\n").unwrap();
    assert_eq!(list.texts(), ["9", "set"]);
}

#[test]
fn line_comments_are_removed() {
    assert_eq!(texts("a // trailing words\nb\n"), ["a", "b"]);
}

#[test]
fn pragma_and_line_are_ignored() {
    assert_eq!(texts("#pragma once\n#line 99\nx\n"), ["x"]);
}

#[test]
fn error_directive_is_fatal() {
    let rendered = error("#error unsupported platform\n");
    assert!(rendered.contains("#error unsupported platform"));
    assert!(rendered.starts_with("test.c:1:"));
}

#[test]
fn unknown_directives_are_fatal() {
    assert!(error("#frobnicate\n").contains("unknown preprocessor directive #frobnicate"));
}

#[test]
fn unterminated_conditional_is_fatal() {
    assert!(error("#ifdef X\nx\n").contains("missing #endif"));
    assert!(error("#endif\n").contains("#endif without a matching #if"));
    assert!(error("#else\n").contains("#else without a matching #if"));
}

#[test]
fn strip_newlines_drops_line_tokens() {
    let mut list = lex("a\nb\n", "test.c", LexMode::Preprocessor, 64).unwrap();
    assert_eq!(list.texts(), ["a", "\n", "b", "\n"]);
    strip_newlines(&mut list);
    assert_eq!(list.texts(), ["a", "b"]);
}

#[test]
fn includes_splice_and_guard_against_repeats() {
    let dir = std::env::temp_dir().join(format!("m2planet-inc-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("consts.h"), "#define ANSWER 42\n").unwrap();
    let main = dir.join("main.c");
    fs::write(
        &main,
        "#include \"consts.h\"\n#include \"consts.h\"\nANSWER\n",
    )
    .unwrap();

    let sess = session();
    let source = fs::read_to_string(&main).unwrap();
    let mut list = lex(
        &source,
        &main.display().to_string(),
        LexMode::Preprocessor,
        sess.max_string,
    )
    .unwrap();
    let mut env = base_environment(&sess);
    preprocess(&mut list, &mut env, &sess).unwrap();
    strip_newlines(&mut list);
    assert_eq!(list.texts(), ["42"]);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn bracket_includes_search_the_library_root() {
    let dir = std::env::temp_dir().join(format!("m2planet-sys-{}", std::process::id()));
    fs::create_dir_all(dir.join("linux")).unwrap();
    fs::write(dir.join("linux").join("fcntl.h"), "#define O_RDONLY 0\n").unwrap();
    let mut sess = session();
    sess.m2libc_path = dir.clone();
    let list = run_with(&sess, "#include <fcntl.h>\nO_RDONLY\n").unwrap();
    assert_eq!(list.texts(), ["0"]);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_includes_are_fatal_but_gcc_req_is_not() {
    assert!(error("#include \"no/such/file.h\"\n").contains("include file not found"));
    assert_eq!(texts("#include \"../gcc_req.h\"\nx\n"), ["x"]);
}

#[test]
fn no_includes_turns_the_directive_off() {
    let mut sess = session();
    sess.no_includes = true;
    let list = run_with(&sess, "#include \"no/such/file.h\"\nx\n").unwrap();
    assert_eq!(list.texts(), ["x"]);
}

#[test]
fn stdio_include_is_reported() {
    let dir = std::env::temp_dir().join(format!("m2planet-stdio-{}", std::process::id()));
    fs::create_dir_all(dir.join("linux")).unwrap();
    fs::write(dir.join("stdio.h"), "#define EOF -1\n").unwrap();
    let mut sess = session();
    sess.m2libc_path = dir.clone();
    let mut list = lex("#include <stdio.h>\n", "test.c", LexMode::Preprocessor, 64).unwrap();
    let mut env = base_environment(&sess);
    let outcome = preprocess(&mut list, &mut env, &sess).unwrap();
    assert!(outcome.uses_stdio);
    fs::remove_dir_all(&dir).unwrap();
}
