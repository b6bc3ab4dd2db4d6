use vdict_types::{Cid, TypeError};

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document is published under the requested identity.
    #[error("document not found: {0}")]
    NotFound(Cid),

    /// The store could not be reached or answered with a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A document could not be encoded, or a stored payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store answered with an identity that does not validate.
    #[error("invalid identity from store: {0}")]
    InvalidIdentity(#[from] TypeError),

    /// I/O error while reading local configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store configuration could not be parsed.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
