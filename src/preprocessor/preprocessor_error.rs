use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("unknown preprocessor directive {0}")]
    UnknownDirective(String),
    #[error("missing #endif for conditional block")]
    UnbalancedConditional,
    #[error("{0} without a matching #if")]
    DanglingConditional(&'static str),
    #[error("#error {0}")]
    ErrorDirective(String),
    #[error("malformed {0} directive")]
    MalformedDirective(&'static str),
    #[error("include file not found: {0}")]
    IncludeNotFound(String),
    #[error("could not read include {path}: {reason}")]
    IncludeRead { path: String, reason: String },
}
