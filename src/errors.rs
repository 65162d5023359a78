//! Crate-wide fatal diagnostics.
//!
//! Every pass owns its error vocabulary; a [`CompileError`] pairs one of
//! those errors with the source position of the token being processed and
//! renders as `<file>:<line>: <message>`. All diagnostics are fatal: the
//! driver prints the rendered error and exits with status 1.

use crate::codegen::CodegenError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::preprocessor::PreprocessError;
use crate::types::TypeError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

#[derive(Debug, Error)]
#[error("{file}:{line}: {kind}")]
pub struct CompileError {
    pub file: String,
    pub line: u64,
    pub kind: ErrorKind,
}

impl ErrorKind {
    /// Attach a source position, producing the final fatal diagnostic.
    pub fn at(self, file: &str, line: u64) -> CompileError {
        CompileError {
            file: file.to_owned(),
            line,
            kind: self,
        }
    }
}
