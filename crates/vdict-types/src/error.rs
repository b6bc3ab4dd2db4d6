use thiserror::Error;

/// Errors produced when validating identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier must be a string, got {0}")]
    NotAString(&'static str),

    #[error("unsupported identifier prefix in {0:?}, expected /ipfs/")]
    InvalidPrefix(String),

    #[error("invalid character {ch:?} at position {position} in identifier hash")]
    InvalidCharacter { ch: char, position: usize },
}
