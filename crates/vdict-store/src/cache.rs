use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;
use vdict_types::Cid;

use crate::error::StoreResult;
use crate::traits::{ContentStore, Document};

/// Read-through cache in front of another [`ContentStore`].
///
/// Content at an identity never changes, so entries never go stale and
/// nothing is ever evicted. A hit skips the inner store entirely.
///
/// Two threads asking for the same uncached identity at once may both
/// fetch it; both get identical content, so the second insert is dropped.
pub struct CachedStore<S> {
    inner: S,
    entries: RwLock<HashMap<Cid, Value>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: ContentStore> CachedStore<S> {
    /// Wrap `inner` with an empty cache.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Whether `cid` would be served from the cache.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.entries.read().expect("lock poisoned").contains_key(cid)
    }

    /// Lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that went to the inner store.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn remember(&self, cid: &Cid, value: Value) {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.entry(cid.clone()).or_insert(value);
    }
}

impl<S: ContentStore> ContentStore for CachedStore<S> {
    fn put(&self, document: &Document) -> StoreResult<Cid> {
        let cid = self.inner.put(document)?;
        // The identity now names exactly this content.
        self.remember(&cid, Value::Object(document.clone()));
        Ok(cid)
    }

    fn get(&self, cid: &Cid) -> StoreResult<Value> {
        if let Some(value) = self.entries.read().expect("lock poisoned").get(cid) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(cid = %cid.short_id(), "cache hit");
            return Ok(value.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cid = %cid.short_id(), "cache miss");
        let value = self.inner.get(cid)?;
        self.remember(cid, value.clone());
        Ok(value)
    }
}

impl<S> std::fmt::Debug for CachedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().expect("lock poisoned").len();
        f.debug_struct("CachedStore")
            .field("cached", &count)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
