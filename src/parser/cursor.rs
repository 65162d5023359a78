//! Forward-only view over the token stream.
//!
//! The cursor never mutates the list; by the time parsing starts the
//! preprocessor has finished rewriting it. Position reporting falls back
//! to the last token when the cursor has run off the end, so errors at
//! end of input still carry a useful location.

use crate::errors::{CompileError, ErrorKind};
use crate::lexer::token::{TokenId, TokenList};

use super::ParseError;

pub struct Cursor<'a> {
    tokens: &'a TokenList,
    at: Option<TokenId>,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a TokenList) -> Self {
        Self {
            tokens,
            at: tokens.head(),
        }
    }

    pub fn at_end(&self) -> bool {
        self.at.is_none()
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.at.map(|id| self.tokens.text(id))
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'a str> {
        let mut at = self.at;
        for _ in 0..n {
            at = at.and_then(|id| self.tokens.next(id));
        }
        at.map(|id| self.tokens.text(id))
    }

    /// Advance past the current token.
    pub fn bump(&mut self) {
        self.at = self.at.and_then(|id| self.tokens.next(id));
    }

    /// Advance only when the current token matches `text`.
    pub fn bump_if(&mut self, text: &str) -> bool {
        if self.peek() == Some(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Take the current token's text and advance.
    pub fn take(&mut self) -> Result<String, CompileError> {
        match self.peek() {
            Some(text) => {
                let text = text.to_owned();
                self.bump();
                Ok(text)
            }
            None => Err(self.fail(ParseError::UnexpectedEof)),
        }
    }

    /// Require the current token to be exactly `required` and advance.
    pub fn expect(&mut self, required: &str) -> Result<(), CompileError> {
        match self.peek() {
            Some(text) if text == required => {
                self.bump();
                Ok(())
            }
            Some(text) => Err(self.fail(ParseError::ExpectedButGot {
                required: required.to_owned(),
                got: text.to_owned(),
            })),
            None => Err(self.fail(ParseError::UnexpectedEof)),
        }
    }

    /// Attach the current position (or the last token's when at end of
    /// input) to an error.
    pub fn fail(&self, kind: impl Into<ErrorKind>) -> CompileError {
        let position = self.at.or_else(|| self.tokens.tail());
        match position {
            Some(id) => {
                let token = self.tokens.get(id);
                kind.into().at(&token.file, token.line)
            }
            None => kind.into().at("<input>", 0),
        }
    }
}
