//! Byte stream to token list.
//!
//! Tokens are classified by their leading character, with greedy runs for
//! identifier/number characters and for the relational/bitwise operator
//! set, so compounds like `==`, `<<=` or `&&` arrive as single tokens.
//! String and character literals are preserved verbatim, quotes included.
//!
//! The two frontend modes differ only in whether newlines and `//` line
//! comments become tokens (preprocessor mode) or are discarded together
//! with `#` directive lines (bootstrap mode).

pub mod cursor;
pub mod token;

mod lexer_error;
#[cfg(test)]
mod lexer_tests;

pub use lexer_error::LexError;
pub use token::{Token, TokenId, TokenList};

use crate::errors::{CompileError, ErrorKind, Result};
use cursor::Cursor;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    /// Strip comments, newlines and `#` directive lines; the preprocessor
    /// pass is skipped entirely for sources this old.
    Bootstrap,
    /// Keep newlines and `//` tokens in band for the preprocessor.
    Preprocessor,
}

/// Lex a whole source file into a fresh token list.
pub fn lex(source: &str, file: &str, mode: LexMode, max_string: usize) -> Result<TokenList> {
    let mut lexer = Lexer {
        cur: Cursor::new(source),
        file: Rc::from(file),
        line: 1,
        mode,
        max_string,
        out: TokenList::new(),
    };
    lexer.run()?;
    // The lexer prepends; one reversal restores source order.
    lexer.out.reverse();
    Ok(lexer.out)
}

/// Lex a source file and append its tokens at the tail of `list`.
pub fn lex_into(
    list: &mut TokenList,
    source: &str,
    file: &str,
    mode: LexMode,
    max_string: usize,
) -> Result<()> {
    let fresh = lex(source, file, mode, max_string)?;
    let at = list.tail();
    list.splice_after(at, fresh);
    Ok(())
}

const OPERATOR_RUN: &str = "<=>|&!^%";

struct Lexer<'a> {
    cur: Cursor<'a>,
    file: Rc<str>,
    line: u64,
    mode: LexMode,
    max_string: usize,
    out: TokenList,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    fn fail(&self, kind: LexError) -> CompileError {
        ErrorKind::from(kind).at(&self.file, self.line)
    }

    fn push(&mut self, text: impl Into<String>, line: u64) {
        self.out.push_front(text, self.file.clone(), line);
    }

    fn grow(&mut self, hold: &mut String, c: char) -> Result<()> {
        if hold.len() >= self.max_string {
            return Err(self.fail(LexError::TokenTooLong(self.max_string)));
        }
        hold.push(c);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        loop {
            while self.cur.skip_if(|c| c == ' ' || c == '\t' || c == '\r') {}
            let Some(c) = self.cur.peek() else {
                return Ok(());
            };
            match c {
                '\n' => {
                    self.cur.take();
                    if self.mode == LexMode::Preprocessor {
                        self.push("\n", self.line);
                    }
                    self.line += 1;
                }
                '#' => self.lex_directive_head()?,
                _ if is_name_char(c) => self.lex_name()?,
                _ if OPERATOR_RUN.contains(c) => self.lex_operator_run()?,
                '\'' | '"' => self.lex_string(c)?,
                '/' => self.lex_slash()?,
                '*' | '+' | '-' => self.lex_short_operator(c),
                _ => {
                    self.cur.take();
                    self.push(c.to_string(), self.line);
                }
            }
        }
    }

    /// `#` plus the longest following name run forms the directive head.
    /// Bootstrap sources predate the preprocessor, so the whole line is
    /// discarded there.
    fn lex_directive_head(&mut self) -> Result<()> {
        let line = self.line;
        self.cur.take();
        let mut hold = String::from("#");
        while let Some(c) = self.cur.peek().filter(|&c| is_name_char(c)) {
            self.cur.take();
            self.grow(&mut hold, c)?;
        }
        match self.mode {
            LexMode::Bootstrap => {
                while self.cur.peek().is_some_and(|c| c != '\n') {
                    self.cur.take();
                }
            }
            LexMode::Preprocessor => self.push(hold, line),
        }
        Ok(())
    }

    fn lex_name(&mut self) -> Result<()> {
        let line = self.line;
        let mut hold = String::new();
        while let Some(c) = self.cur.peek().filter(|&c| is_name_char(c)) {
            self.cur.take();
            self.grow(&mut hold, c)?;
        }
        // `name:` is a label definition; it becomes a single `:name` token.
        if self.cur.peek() == Some(':') {
            self.cur.take();
            hold.insert(0, ':');
        }
        self.push(hold, line);
        Ok(())
    }

    fn lex_operator_run(&mut self) -> Result<()> {
        let line = self.line;
        let mut hold = String::new();
        while let Some(c) = self.cur.peek().filter(|&c| OPERATOR_RUN.contains(c)) {
            self.cur.take();
            self.grow(&mut hold, c)?;
        }
        self.push(hold, line);
        Ok(())
    }

    /// Preserve a quoted literal verbatim, honoring backslash escapes so a
    /// `\"` does not terminate it. Escape decoding happens in the string
    /// encoder, not here.
    fn lex_string(&mut self, delim: char) -> Result<()> {
        let line = self.line;
        let mut hold = String::new();
        self.cur.take();
        self.grow(&mut hold, delim)?;
        loop {
            let Some(c) = self.cur.take() else {
                return Err(self.fail(LexError::UnterminatedString));
            };
            if c == '\n' {
                self.line += 1;
            }
            self.grow(&mut hold, c)?;
            if c == '\\' {
                let Some(escaped) = self.cur.take() else {
                    return Err(self.fail(LexError::UnterminatedString));
                };
                self.grow(&mut hold, escaped)?;
                continue;
            }
            if c == delim {
                break;
            }
        }
        self.push(hold, line);
        Ok(())
    }

    fn lex_slash(&mut self) -> Result<()> {
        self.cur.take();
        match self.cur.peek() {
            Some('*') => {
                self.cur.take();
                loop {
                    match self.cur.take() {
                        Some('*') if self.cur.peek() == Some('/') => {
                            self.cur.take();
                            return Ok(());
                        }
                        Some('\n') => self.line += 1,
                        Some(_) => {}
                        None => return Err(self.fail(LexError::UnterminatedComment)),
                    }
                }
            }
            Some('/') => {
                self.cur.take();
                match self.mode {
                    LexMode::Bootstrap => {
                        while self.cur.peek().is_some_and(|c| c != '\n') {
                            self.cur.take();
                        }
                    }
                    LexMode::Preprocessor => {
                        if !self.change_filename()? {
                            // the whole comment is one token; its body must
                            // not reach the literal and operator lexers
                            let line = self.line;
                            let mut hold = String::from("//");
                            while let Some(c) = self.cur.peek().filter(|&c| c != '\n') {
                                self.cur.take();
                                self.grow(&mut hold, c)?;
                            }
                            self.push(hold, line);
                        }
                    }
                }
                Ok(())
            }
            Some('=') => {
                self.cur.take();
                self.push("/=", self.line);
                Ok(())
            }
            _ => {
                self.push("/", self.line);
                Ok(())
            }
        }
    }

    /// `// #FILENAME "path" line` rewrites the current source position, so
    /// diagnostics keep pointing at the original file when recompiling
    /// preprocessed output. Returns false when the comment is an ordinary
    /// one and should be tokenized.
    fn change_filename(&mut self) -> Result<bool> {
        let probe = self.cur.clone();
        while self.cur.skip_if(|c| c == ' ' || c == '\t') {}
        let mut head = String::new();
        while let Some(c) = self.cur.peek().filter(|&c| is_name_char(c) || c == '#') {
            self.cur.take();
            head.push(c);
        }
        if head != "#FILENAME" {
            self.cur = probe;
            return Ok(false);
        }
        while self.cur.skip_if(|c| c == ' ' || c == '\t') {}
        if self.cur.take() != Some('"') {
            return Err(self.fail(LexError::UnknownFilenameDirective));
        }
        let mut path = String::new();
        loop {
            match self.cur.take() {
                Some('"') => break,
                Some(c) if c != '\n' => path.push(c),
                _ => return Err(self.fail(LexError::UnknownFilenameDirective)),
            }
        }
        while self.cur.skip_if(|c| c == ' ' || c == '\t') {}
        let mut digits = String::new();
        while let Some(c) = self.cur.peek().filter(char::is_ascii_digit) {
            self.cur.take();
            digits.push(c);
        }
        let line: u64 = digits
            .parse()
            .map_err(|_| self.fail(LexError::UnknownFilenameDirective))?;
        while self.cur.skip_if(|c| c == ' ' || c == '\t') {}
        match self.cur.peek() {
            Some('\n') => {
                self.cur.take();
            }
            None => {}
            Some(_) => return Err(self.fail(LexError::UnknownFilenameDirective)),
        }
        self.file = Rc::from(path.as_str());
        self.line = line;
        Ok(true)
    }

    fn lex_short_operator(&mut self, first: char) {
        let line = self.line;
        self.cur.take();
        let two = self.cur.peek().and_then(|second| {
            let compound = match (first, second) {
                ('*', '=') => "*=",
                ('+', '=') => "+=",
                ('+', '+') => "++",
                ('-', '=') => "-=",
                ('-', '-') => "--",
                ('-', '>') => "->",
                _ => return None,
            };
            Some(compound)
        });
        match two {
            Some(tok) => {
                self.cur.take();
                self.push(tok, line);
            }
            None => self.push(first.to_string(), line),
        }
    }
}
