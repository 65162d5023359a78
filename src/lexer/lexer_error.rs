use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("token exceeds --max-string of {0}")]
    TokenTooLong(usize),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unknown escape sequence \\{0}")]
    UnknownEscape(char),
    #[error("malformed #FILENAME directive")]
    UnknownFilenameDirective,
}
