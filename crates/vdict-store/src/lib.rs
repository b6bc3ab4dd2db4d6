//! Content-addressed document storage for versioned dictionaries.
//!
//! A store maps JSON documents to [`Cid`]s and back. The dictionary layer
//! never computes identities itself: whatever the store returns from `put`
//! becomes the document's identity.
//!
//! # Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//! - [`IpfsHttpStore`] -- blocking client for an IPFS daemon's RPC API
//! - [`CachedStore`] -- read-through cache layered over any other backend
//!
//! # Design Rules
//!
//! 1. Documents are immutable once written (content-addressing guarantees this).
//! 2. A cached document never goes stale, so the cache has no eviction.
//! 3. Failures are surfaced as-is; this layer never retries.
//! 4. Documents are encoded canonically (sorted keys, compact JSON) before
//!    they are hashed or sent, see [`encoding`].
//!
//! [`Cid`]: vdict_types::Cid

pub mod cache;
pub mod config;
pub mod encoding;
pub mod error;
pub mod finite;
pub mod http;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use cache::CachedStore;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use finite::to_finite_value;
pub use http::{connect, IpfsHttpStore};
pub use memory::InMemoryContentStore;
pub use traits::{json_kind, ContentStore, Document};
