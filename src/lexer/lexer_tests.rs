use super::*;

fn texts(source: &str, mode: LexMode) -> Vec<String> {
    let tokens = lex(source, "test.c", mode, 4096).expect("lexing failed");
    tokens.texts().iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn test_basic_function() {
    let lexed = texts("int main() {return 42;}", LexMode::Bootstrap);
    let expected = vec!["int", "main", "(", ")", "{", "return", "42", ";", "}"];
    assert_eq!(expected, lexed);
}

#[test]
fn test_operator_runs() {
    let lexed = texts("a <= b == c >> d && e", LexMode::Bootstrap);
    let expected = vec!["a", "<=", "b", "==", "c", ">>", "d", "&&", "e"];
    assert_eq!(expected, lexed);
}

#[test]
fn test_two_char_operators() {
    let lexed = texts("x-- ++y a->b c -= 1 d /= 2", LexMode::Bootstrap);
    let expected = vec![
        "x", "--", "++", "y", "a", "->", "b", "c", "-=", "1", "d", "/=", "2",
    ];
    assert_eq!(expected, lexed);
}

#[test]
fn test_label_rewrite() {
    let lexed = texts("top: x = x + 1; goto top;", LexMode::Bootstrap);
    let expected = vec![":top", "x", "=", "x", "+", "1", ";", "goto", "top", ";"];
    assert_eq!(expected, lexed);
}

#[test]
fn test_string_preserved_verbatim() {
    let lexed = texts("char* s = \"hi\\n\";", LexMode::Bootstrap);
    let expected = vec!["char", "*", "s", "=", "\"hi\\n\"", ";"];
    assert_eq!(expected, lexed);
}

#[test]
fn test_escaped_quote_does_not_terminate() {
    let lexed = texts(r#""a\"b""#, LexMode::Bootstrap);
    assert_eq!(vec![r#""a\"b""#], lexed);
}

#[test]
fn test_unterminated_string() {
    let result = lex("\"abc", "test.c", LexMode::Bootstrap, 4096);
    let err = result.expect_err("should fail");
    assert!(err.to_string().contains("unterminated string"));
}

#[test]
fn test_unterminated_comment() {
    let result = lex("int x; /* no end", "test.c", LexMode::Bootstrap, 4096);
    let err = result.expect_err("should fail");
    assert!(err.to_string().contains("unterminated block comment"));
}

#[test]
fn test_token_too_long() {
    let source = "x".repeat(64);
    let result = lex(&source, "test.c", LexMode::Bootstrap, 16);
    let err = result.expect_err("should fail");
    assert!(err.to_string().contains("--max-string"));
}

#[test]
fn test_comments_discarded() {
    let lexed = texts("int x; /* gone */ int y; // also gone\nint z;", LexMode::Bootstrap);
    let expected = vec!["int", "x", ";", "int", "y", ";", "int", "z", ";"];
    assert_eq!(expected, lexed);
}

#[test]
fn test_preprocessor_mode_keeps_newlines_and_comments() {
    let lexed = texts("#define X 1\nint y; // tail\n", LexMode::Preprocessor);
    let expected = vec![
        "#define", "X", "1", "\n", "int", "y", ";", "// tail", "\n",
    ];
    assert_eq!(expected, lexed);
}

#[test]
fn test_comment_bodies_are_opaque() {
    // quotes and comment openers inside a line comment are plain text
    let lexed = texts("int x; // don't stop\nint y; // a \"b\" /* c\nint z;\n",
        LexMode::Preprocessor);
    let expected = vec![
        "int", "x", ";", "// don't stop", "\n",
        "int", "y", ";", "// a \"b\" /* c", "\n",
        "int", "z", ";", "\n",
    ];
    assert_eq!(expected, lexed);
}

#[test]
fn test_bootstrap_mode_strips_directives() {
    let lexed = texts("#define X 1\nint y;\n", LexMode::Bootstrap);
    let expected = vec!["int", "y", ";"];
    assert_eq!(expected, lexed);
}

#[test]
fn test_line_numbers() {
    let tokens = lex("int x;\nint y;\n", "test.c", LexMode::Bootstrap, 4096).unwrap();
    let lines: Vec<u64> = tokens.ids().map(|id| tokens.get(id).line).collect();
    assert_eq!(vec![1, 1, 1, 2, 2, 2], lines);
}

#[test]
fn test_filename_directive_rewrites_position() {
    let source = "int a;\n// #FILENAME \"other.c\" 7\nint b;\n";
    let tokens = lex(source, "test.c", LexMode::Preprocessor, 4096).unwrap();
    let b = tokens
        .ids()
        .find(|&id| tokens.text(id) == "b")
        .expect("token b");
    assert_eq!("other.c", &*tokens.get(b).file);
    assert_eq!(7, tokens.get(b).line);
}

#[test]
fn test_malformed_filename_directive() {
    let source = "// #FILENAME nope\n";
    let err = lex(source, "test.c", LexMode::Preprocessor, 4096).expect_err("should fail");
    assert!(err.to_string().contains("#FILENAME"));
}

#[test]
fn test_reverse_round_trip() {
    let mut tokens = lex("int main() {return 0;}", "t.c", LexMode::Bootstrap, 4096).unwrap();
    let forward: Vec<String> = tokens.texts().iter().map(|s| (*s).to_string()).collect();
    tokens.reverse();
    tokens.reverse();
    let again: Vec<String> = tokens.texts().iter().map(|s| (*s).to_string()).collect();
    assert_eq!(forward, again);
    // links stay reciprocal
    for id in tokens.ids().collect::<Vec<_>>() {
        if let Some(next) = tokens.next(id) {
            assert_eq!(Some(id), tokens.prev(next));
        }
    }
}
