use thiserror::Error;
use vdict_types::{Cid, TypeError};

#[derive(Debug, Error)]
pub enum DictError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] TypeError),

    #[error("malformed snapshot {cid}: {reason}")]
    MalformedSnapshot { cid: Cid, reason: String },

    #[error("field name {0:?} is reserved")]
    ReservedField(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] vdict_store::StoreError),
}

pub type DictResult<T> = Result<T, DictError>;
