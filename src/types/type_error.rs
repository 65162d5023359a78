use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown member {member} in {parent}")]
    UnknownMember { parent: String, member: String },
    #[error("array size must be a positive integer literal, got {0}")]
    UnsupportedArrayForm(String),
}
