//! Versioned dictionaries over a content-addressed store.
//!
//! A [`VersionedDict`] is an ordered bag of named JSON fields that is saved
//! to the store as one document and takes the returned [`Cid`] as its
//! identity. A [`VersionedDictChain`] additionally records the identity it
//! had before each save, so every published version points back at its
//! predecessor and the whole history can be walked and diffed.
//!
//! The store is injected; nothing here holds global connection state.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vdict_sdk::{VersionedDictChain, InMemoryContentStore};
//!
//! let store = Arc::new(InMemoryContentStore::new());
//! let mut chain = VersionedDictChain::new(store);
//! chain.set("key", "value")?;
//! let first = chain.save()?;
//! chain.set("key", "new_value")?;
//! chain.save()?;
//! assert_eq!(chain.previous_cid(), Some(&first));
//! # Ok::<(), vdict_sdk::DictError>(())
//! ```

pub mod chain;
pub mod dict;
pub mod error;

pub use chain::{Ancestor, Lineage, VersionedDictChain, PREVIOUS_CID, RESERVED_FIELDS};
pub use dict::{SharedStore, VersionedDict};
pub use error::{DictError, DictResult};

// Re-export key types
pub use vdict_diff::{ChangeSet, FieldChange, Fields};
pub use vdict_store::{
    CachedStore, ContentStore, Document, InMemoryContentStore, IpfsHttpStore, StoreConfig,
    StoreError,
};
pub use vdict_types::{Cid, TypeError};
