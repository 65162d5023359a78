use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {required:?} but got {got:?}")]
    ExpectedButGot { required: String, got: String },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("undeclared identifier {0}")]
    UndeclaredIdentifier(String),
    #[error("unknown type {0}")]
    UnknownType(String),
    #[error("invalid number {0}")]
    InvalidNumber(String),
    #[error("case value must be an integer literal, got {0}")]
    CaseValueNotLiteral(String),
    #[error("assignment target is not an lvalue")]
    LvalueRequired,
    #[error("break outside of a loop or switch")]
    BreakOutsideLoop,
    #[error("continue outside of a loop")]
    ContinueOutsideLoop,
    #[error("{0}")]
    Unsupported(String),
}
