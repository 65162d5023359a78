use super::{assemble, dump_tokens, render_tokens};
use crate::codegen::{Architecture, OperatingSystem};
use crate::lexer::{lex, LexMode};
use crate::parser::ParseOutput;
use crate::session::{Session, DEFAULT_MAX_STRING};

fn sample() -> ParseOutput {
    ParseOutput {
        code: "ret\n".to_owned(),
        globals: ":GLOBAL_x\nNULL\n".to_owned(),
        strings: ":_string_0\n\"hi\"\n".to_owned(),
    }
}

#[test]
fn elf_targets_end_at_elf_end() {
    let session = Session::new(Architecture::X86, OperatingSystem::Linux);
    assert_eq!(
        assemble(&sample(), &session),
        "\n# Core program\n\
         ret\n\
         \n# Program global variables\n\
         :GLOBAL_x\nNULL\n\
         \n# Program strings\n\
         :_string_0\n\"hi\"\n\
         \n:ELF_end\n"
    );
}

#[test]
fn knight_native_ends_at_stack() {
    let session = Session::new(Architecture::KnightNative, OperatingSystem::Linux);
    let image = assemble(&sample(), &session);
    assert!(image.ends_with("\n:STACK\n"));
    assert!(!image.contains(":ELF_end"));
}

#[test]
fn debug_markers_replace_the_end_symbol() {
    let mut session = Session::new(Architecture::Amd64, OperatingSystem::Linux);
    session.debug_info = true;
    let image = assemble(&sample(), &session);
    assert!(image.contains("ret\n\n:ELF_data\n\n# Program global variables\n"));
    assert!(!image.contains(":ELF_end"));
}

#[test]
fn rendered_tokens_carry_a_filename_stamp() {
    let tokens = lex("int x ;\n", "input.c", LexMode::Preprocessor, DEFAULT_MAX_STRING).unwrap();
    assert_eq!(
        render_tokens(&tokens),
        "\n// #FILENAME \"input.c\" 1\nint x ; \n"
    );
}

#[test]
fn dump_is_reversed_one_per_line() {
    let tokens = lex("a b c", "input.c", LexMode::Bootstrap, DEFAULT_MAX_STRING).unwrap();
    assert_eq!(dump_tokens(&tokens), "c\nb\na\n");
}
