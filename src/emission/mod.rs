//! Final output assembly: the three parser streams concatenated behind
//! fixed section headers, plus the token-stream printers behind the
//! preprocess-only and dump modes.

#[cfg(test)]
mod emission_tests;

use crate::codegen::Architecture;
use crate::lexer::token::TokenList;
use crate::parser::ParseOutput;
use crate::session::Session;

/// Concatenate the streams in their fixed order. Knight-native images
/// end at `:STACK`; ELF targets end at `:ELF_end` unless debug markers
/// were requested, in which case `:ELF_data` separates code from data
/// and the linker supplies the end symbol.
pub fn assemble(output: &ParseOutput, session: &Session) -> String {
    let knight_native = session.arch == Architecture::KnightNative;
    let mut out = String::with_capacity(
        output.code.len() + output.globals.len() + output.strings.len() + 128,
    );
    out.push_str("\n# Core program\n");
    out.push_str(&output.code);
    if session.debug_info && !knight_native {
        out.push_str("\n:ELF_data\n");
    }
    out.push_str("\n# Program global variables\n");
    out.push_str(&output.globals);
    out.push_str("\n# Program strings\n");
    out.push_str(&output.strings);
    if knight_native {
        out.push_str("\n:STACK\n");
    } else if !session.debug_info {
        out.push_str("\n:ELF_end\n");
    }
    out
}

/// Render the post-preprocessing stream as compilable source, with a
/// `#FILENAME` stamp regenerated wherever the origin file changes so a
/// second pass reports positions against the right files.
pub fn render_tokens(tokens: &TokenList) -> String {
    let mut out = String::new();
    let mut current: Option<&str> = None;
    for id in tokens.ids() {
        let token = tokens.get(id);
        if current != Some(token.file.as_ref()) {
            out.push_str(&format!(
                "\n// #FILENAME \"{}\" {}\n",
                token.file, token.line
            ));
            current = Some(token.file.as_ref());
        }
        if token.text == "\n" {
            out.push('\n');
        } else {
            out.push_str(&token.text);
            out.push(' ');
        }
    }
    out
}

/// The raw token stream in reverse, one token per line.
pub fn dump_tokens(tokens: &TokenList) -> String {
    let mut out = String::new();
    let mut at = tokens.tail();
    while let Some(id) = at {
        out.push_str(tokens.text(id));
        out.push('\n');
        at = tokens.prev(id);
    }
    out
}
