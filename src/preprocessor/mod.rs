//! In-place token stream rewriting.
//!
//! The preprocessor walks the list the lexer built and edits it: directive
//! lines and suppressed conditional regions are unlinked, object macros
//! are replaced by their expansion at the use site, and `#include` splices
//! the included file's freshly lexed tokens into the stream, bracketed by
//! `#FILENAME` boundary markers. Parsing starts on whatever survives.

mod expr;
mod preprocessor_error;
#[cfg(test)]
mod preprocessor_tests;

pub use preprocessor_error::PreprocessError;

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{CompileError, ErrorKind, Result};
use crate::lexer::token::{TokenId, TokenList};
use crate::lexer::{lex, LexMode};
use crate::session::{debug, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroOrigin {
    Builtin,
    ArchPreset,
    CommandLine,
    Source,
}

#[derive(Debug, Clone)]
pub struct MacroDefinition {
    pub expansion: Vec<String>,
    pub origin: MacroOrigin,
}

pub type MacroEnv = FxHashMap<String, MacroDefinition>;

/// Facts the later stages need from this pass.
#[derive(Debug, Default)]
pub struct PreprocessOutcome {
    /// Someone included `stdio.h`; the driver reports it at high
    /// verbosity so bootstrap builds can spot an accidental libc
    /// dependency.
    pub uses_stdio: bool,
}

/// Macro environment as it stands before any source file is read:
/// `__M2__`, the architecture and OS presets, then `-D` definitions in
/// command-line order.
pub fn base_environment(session: &Session) -> MacroEnv {
    let mut env = MacroEnv::default();
    let mut install = |name: &str, value: &str, origin| {
        env.insert(
            name.to_owned(),
            MacroDefinition {
                expansion: value.split_whitespace().map(str::to_owned).collect(),
                origin,
            },
        );
    };
    install("__M2__", "1", MacroOrigin::Builtin);
    for &(name, value) in session.arch.preset_macros() {
        install(name, value, MacroOrigin::ArchPreset);
    }
    install(session.os.preset_macro(), "1", MacroOrigin::ArchPreset);
    for define in &session.defines {
        install(
            &define.name,
            define.value.as_deref().unwrap_or("1"),
            MacroOrigin::CommandLine,
        );
    }
    env
}

pub fn preprocess(
    list: &mut TokenList,
    env: &mut MacroEnv,
    session: &Session,
) -> Result<PreprocessOutcome> {
    let mut pass = Preprocessor {
        list,
        env,
        session,
        conds: Vec::new(),
        included: FxHashSet::default(),
        uses_stdio: false,
    };
    pass.run()?;
    Ok(PreprocessOutcome {
        uses_stdio: pass.uses_stdio,
    })
}

/// Drop the newline tokens once nothing downstream needs line structure.
pub fn strip_newlines(list: &mut TokenList) {
    let mut at = list.head();
    while let Some(id) = at {
        if list.text(id) == "\n" {
            at = list.eat(id);
        } else {
            at = list.next(id);
        }
    }
}

struct CondFrame {
    emitting: bool,
    seen_true: bool,
    parent_emitting: bool,
    file: Rc<str>,
    line: u64,
}

struct Preprocessor<'a> {
    list: &'a mut TokenList,
    env: &'a mut MacroEnv,
    session: &'a Session,
    conds: Vec<CondFrame>,
    included: FxHashSet<PathBuf>,
    uses_stdio: bool,
}

/// Nested macro expansion gives up past this depth and keeps the name
/// literal, which breaks definition cycles both in the stream and in
/// `#if` bodies.
const MAX_EXPANSION_DEPTH: u8 = 8;

impl Preprocessor<'_> {
    fn emitting(&self) -> bool {
        self.conds.last().map_or(true, |frame| frame.emitting)
    }

    fn run(&mut self) -> Result<()> {
        let mut at = self.list.head();
        while let Some(id) = at {
            let text = self.list.text(id);
            if text.starts_with('#') {
                at = self.directive(id)?;
                continue;
            }
            if !self.emitting() {
                at = self.list.eat(id);
                continue;
            }
            if text.starts_with("//") {
                at = self.list.eat(id);
                continue;
            }
            if text == "\n" {
                at = self.list.next(id);
                continue;
            }
            if self.env.contains_key(text) {
                at = self.substitute(id);
                continue;
            }
            at = self.list.next(id);
        }
        if let Some(frame) = self.conds.first() {
            return Err(ErrorKind::from(PreprocessError::UnbalancedConditional)
                .at(&frame.file, frame.line));
        }
        Ok(())
    }

    /// Replace a macro use with its fully expanded form. Nested names
    /// resolve inside [`Self::expand_into`] under the depth cap, and the
    /// walk resumes past the spliced tokens, so a definition cycle ends
    /// as a literal name instead of rescanning forever.
    fn substitute(&mut self, id: TokenId) -> Option<TokenId> {
        let name = self.list.text(id);
        let Some(definition) = self.env.get(name) else {
            return self.list.next(id);
        };
        let mut expansion = Vec::new();
        self.expand_into(&mut expansion, &definition.expansion, MAX_EXPANSION_DEPTH);
        let (file, line) = {
            let token = self.list.get(id);
            (token.file.clone(), token.line)
        };
        let prev = self.list.prev(id);
        let after = self.list.eat(id);
        if expansion.is_empty() {
            return after;
        }
        let mut fresh = TokenList::new();
        for text in expansion {
            fresh.push_back(text, file.clone(), line);
        }
        self.list.splice_after(prev, fresh);
        after
    }

    /// Process one directive line. The head token and its arguments are
    /// unlinked; the trailing newline stays. Returns where the walk
    /// resumes.
    fn directive(&mut self, id: TokenId) -> Result<Option<TokenId>> {
        let head = self.list.text(id).to_owned();
        let (file, line) = {
            let token = self.list.get(id);
            (token.file.clone(), token.line)
        };
        let mut args = Vec::new();
        let mut cur = self.list.next(id);
        while let Some(t) = cur {
            let text = self.list.text(t);
            if text == "\n" {
                break;
            }
            args.push(text.to_owned());
            cur = self.list.next(t);
        }
        let newline = cur;
        if let Some(comment) = args.iter().position(|t| t.starts_with("//")) {
            args.truncate(comment);
        }
        let position = self.fail_position(id);
        let mut walk = Some(id);
        while let Some(w) = walk {
            if Some(w) == newline {
                break;
            }
            walk = self.list.eat(w);
        }

        let emitting = self.emitting();
        match head.as_str() {
            "#define" => {
                if emitting {
                    let name = args
                        .first()
                        .cloned()
                        .ok_or_else(|| position(PreprocessError::MalformedDirective("#define")))?;
                    self.env.insert(
                        name,
                        MacroDefinition {
                            expansion: args[1..].to_vec(),
                            origin: MacroOrigin::Source,
                        },
                    );
                }
            }
            "#undef" => {
                if emitting {
                    let name = args
                        .first()
                        .ok_or_else(|| position(PreprocessError::MalformedDirective("#undef")))?;
                    self.env.remove(name);
                }
            }
            "#ifdef" | "#ifndef" => {
                let name = args.first().map(String::as_str).unwrap_or("");
                let defined = self.env.contains_key(name);
                let cond = if head == "#ifdef" { defined } else { !defined };
                self.push_cond(cond, file, line);
            }
            "#if" => {
                let cond = emitting && {
                    let expanded = self.expand_for_if(&args);
                    expr::evaluate(&expanded) != 0
                };
                self.push_cond(cond, file, line);
            }
            "#elif" => {
                let live = match self.conds.last() {
                    Some(frame) => frame.parent_emitting && !frame.seen_true,
                    None => {
                        return Err(position(PreprocessError::DanglingConditional("#elif")));
                    }
                };
                let cond = live && {
                    let expanded = self.expand_for_if(&args);
                    expr::evaluate(&expanded) != 0
                };
                if let Some(frame) = self.conds.last_mut() {
                    frame.emitting = cond;
                    frame.seen_true |= cond;
                }
            }
            "#else" => {
                let frame = self
                    .conds
                    .last_mut()
                    .ok_or_else(|| position(PreprocessError::DanglingConditional("#else")))?;
                frame.emitting = frame.parent_emitting && !frame.seen_true;
                frame.seen_true = true;
            }
            "#endif" => {
                self.conds
                    .pop()
                    .ok_or_else(|| position(PreprocessError::DanglingConditional("#endif")))?;
            }
            "#error" => {
                if emitting {
                    return Err(position(PreprocessError::ErrorDirective(args.join(" "))));
                }
            }
            // recognized, nothing to do: positions are stamped on every
            // token at lex time
            "#pragma" | "#line" | "#FILENAME" => {}
            "#include" => {
                if emitting {
                    return self.include(&args, &file, line, newline, position);
                }
            }
            _ => {
                if emitting {
                    return Err(position(PreprocessError::UnknownDirective(head)));
                }
            }
        }
        Ok(newline)
    }

    /// Error constructor pinned to the directive's position, usable after
    /// the directive tokens are unlinked.
    fn fail_position(&self, id: TokenId) -> impl Fn(PreprocessError) -> CompileError {
        let token = self.list.get(id);
        let file = token.file.clone();
        let line = token.line;
        move |kind| ErrorKind::from(kind).at(&file, line)
    }

    fn push_cond(&mut self, cond: bool, file: Rc<str>, line: u64) {
        let parent_emitting = self.emitting();
        self.conds.push(CondFrame {
            emitting: parent_emitting && cond,
            seen_true: cond,
            parent_emitting,
            file,
            line,
        });
    }

    /// Rewrite a `#if` argument list for the evaluator: `defined`
    /// applications become `1`/`0`, other known names expand.
    fn expand_for_if(&self, tokens: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if token == "defined" {
                let (name, width) = if tokens.get(i + 1).map(String::as_str) == Some("(") {
                    (tokens.get(i + 2), 4)
                } else {
                    (tokens.get(i + 1), 2)
                };
                let value = name.is_some_and(|n| self.env.contains_key(n));
                out.push(if value { "1" } else { "0" }.to_owned());
                i += width;
            } else if let Some(definition) = self.env.get(token) {
                self.expand_into(&mut out, &definition.expansion, MAX_EXPANSION_DEPTH);
                i += 1;
            } else {
                out.push(token.clone());
                i += 1;
            }
        }
        out
    }

    fn expand_into(&self, out: &mut Vec<String>, tokens: &[String], depth: u8) {
        for token in tokens {
            match self.env.get(token) {
                Some(definition) if depth > 0 => {
                    self.expand_into(out, &definition.expansion, depth - 1);
                }
                _ => out.push(token.clone()),
            }
        }
    }

    fn include(
        &mut self,
        args: &[String],
        file: &Rc<str>,
        line: u64,
        newline: Option<TokenId>,
        position: impl Fn(PreprocessError) -> CompileError,
    ) -> Result<Option<TokenId>> {
        if self.session.no_includes {
            return Ok(newline);
        }
        let (filename, system) = parse_include_target(args)
            .ok_or_else(|| position(PreprocessError::MalformedDirective("#include")))?;
        // stub header carried around for other compilers
        if filename.ends_with("gcc_req.h") {
            return Ok(newline);
        }
        if filename.ends_with("stdio.h") {
            self.uses_stdio = true;
        }
        let root = &self.session.m2libc_path;
        let candidates: Vec<PathBuf> = if system {
            vec![
                root.join(self.session.os.include_subdir()).join(&filename),
                root.join(&filename),
            ]
        } else {
            let here = Path::new(file.as_ref())
                .parent()
                .unwrap_or_else(|| Path::new("."));
            vec![here.join(&filename), root.join(&filename)]
        };
        let Some(path) = candidates.into_iter().find(|p| p.is_file()) else {
            return Err(position(PreprocessError::IncludeNotFound(filename)));
        };
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !self.included.insert(canonical) {
            // headers come in once, matching the guard-style headers the
            // originals wrap themselves in
            return Ok(newline);
        }
        if self.session.debug_enabled(debug::INCLUDES) {
            eprintln!("including {}", path.display());
        }
        let source = fs::read_to_string(&path).map_err(|err| {
            position(PreprocessError::IncludeRead {
                path: path.display().to_string(),
                reason: err.to_string(),
            })
        })?;
        let path_text = path.display().to_string();
        let included = lex(
            &source,
            &path_text,
            LexMode::Preprocessor,
            self.session.max_string,
        )?;

        let mut fresh = TokenList::new();
        boundary_marker(&mut fresh, &path_text, 1);
        let tail = fresh.tail();
        fresh.splice_after(tail, included);
        boundary_marker(&mut fresh, file.as_ref(), line + 1);

        let anchor = newline.or_else(|| self.list.tail());
        self.list.splice_after(anchor, fresh);
        let resume = match newline {
            Some(id) => Some(id),
            None => anchor
                .and_then(|id| self.list.next(id))
                .or_else(|| self.list.head()),
        };
        Ok(resume)
    }
}

/// `#FILENAME "path" line` group marking an include boundary. The walk
/// consumes it like any other directive; its job is to keep the stream's
/// token order meaningful to a reader of `--dump-mode` output.
fn boundary_marker(list: &mut TokenList, path: &str, line: u64) {
    let file: Rc<str> = Rc::from(path);
    list.push_back("#FILENAME", file.clone(), line);
    list.push_back(format!("\"{path}\""), file.clone(), line);
    list.push_back(line.to_string(), file.clone(), line);
    list.push_back("\n", file, line);
}

/// Split `#include` arguments into the target filename and whether the
/// bracket form was used.
fn parse_include_target(args: &[String]) -> Option<(String, bool)> {
    match args {
        [quoted] if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') => {
            Some((quoted[1..quoted.len() - 1].to_owned(), false))
        }
        [open, parts @ .., close] if open.as_str() == "<" && close.as_str() == ">" => {
            Some((parts.concat(), true))
        }
        _ => None,
    }
}
