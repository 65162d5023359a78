use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodegenError {
    #[error("unsupported architecture {0}")]
    UnsupportedArchitecture(String),
    #[error("unsupported operating system {0}")]
    UnsupportedOs(String),
    #[error("immediate {0} does not fit the target's load sequence")]
    ImmediateOutOfRange(i64),
}
