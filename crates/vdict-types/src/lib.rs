//! Foundation types for versioned dictionaries.
//!
//! Every other vdict crate depends on `vdict-types`. The only identity
//! primitive is [`Cid`]: the canonical `/ipfs/<hash>` string under which a
//! content-addressed store publishes a document.
//!
//! # Key Types
//!
//! - [`Cid`]: Validated, normalized content identifier
//! - [`TypeError`]: Why a candidate identifier was rejected

pub mod cid;
pub mod error;

pub use cid::{Cid, HASH_ALPHABET, IPFS_PREFIX};
pub use error::TypeError;
