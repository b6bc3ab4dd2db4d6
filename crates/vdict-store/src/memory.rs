use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;
use vdict_types::Cid;

use crate::encoding::{canonicalize, content_hash, decode_value, encode_document};
use crate::error::{StoreError, StoreResult};
use crate::traits::{ContentStore, Document};

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Documents are held as their canonical
/// encoding behind a `RwLock`; identities are derived locally from those
/// bytes, so equal content always yields an equal identity.
pub struct InMemoryContentStore {
    documents: RwLock<HashMap<Cid, Vec<u8>>>,
    round_trips: AtomicU64,
}

impl InMemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            round_trips: AtomicU64::new(0),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().expect("lock poisoned").is_empty()
    }

    /// Whether a document is published under `cid`.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.documents.read().expect("lock poisoned").contains_key(cid)
    }

    /// Number of `get` calls this store has answered, hits and misses alike.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Publish an arbitrary JSON value, object or not.
    ///
    /// A real daemon will happily store a bare array or string; this lets
    /// tests reproduce that.
    pub fn put_raw(&self, value: &Value) -> StoreResult<Cid> {
        let bytes = serde_json::to_vec(&canonicalize(value))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.insert(bytes)
    }

    /// Remove all documents from the store.
    pub fn clear(&self) {
        self.documents.write().expect("lock poisoned").clear();
    }

    fn insert(&self, bytes: Vec<u8>) -> StoreResult<Cid> {
        let cid = Cid::new(&content_hash(&bytes)?)?;
        let mut map = self.documents.write().expect("lock poisoned");
        // Idempotent: the same identity always maps to the same bytes.
        map.entry(cid.clone()).or_insert(bytes);
        Ok(cid)
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, document: &Document) -> StoreResult<Cid> {
        let bytes = encode_document(document)?;
        let size = bytes.len();
        let cid = self.insert(bytes)?;
        debug!(cid = %cid.short_id(), size, "stored document");
        Ok(cid)
    }

    fn get(&self, cid: &Cid) -> StoreResult<Value> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        let map = self.documents.read().expect("lock poisoned");
        let bytes = map
            .get(cid)
            .ok_or_else(|| StoreError::NotFound(cid.clone()))?;
        decode_value(bytes)
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryContentStore")
            .field("document_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn put_and_get() {
        let store = InMemoryContentStore::new();
        let cid = store.put(&doc(json!({"key": "value"}))).unwrap();
        assert_eq!(store.get(&cid).unwrap(), json!({"key": "value"}));
    }

    #[test]
    fn empty_document_roundtrip() {
        let store = InMemoryContentStore::new();
        let cid = store.put(&Document::new()).unwrap();
        assert_eq!(store.get(&cid).unwrap(), json!({}));
    }

    #[test]
    fn special_characters_roundtrip() {
        let store = InMemoryContentStore::new();
        let original = json!({
            "special": "!@#$%^&*()",
            "unicode": "\u{1F31F}\u{1F525}",
            "nested": {"path/with/slashes": "value"}
        });
        let cid = store.put(&doc(original.clone())).unwrap();
        assert_eq!(store.get(&cid).unwrap(), original);
    }

    // -----------------------------------------------------------------------
    // Content-addressing correctness
    // -----------------------------------------------------------------------

    #[test]
    fn same_content_produces_same_id() {
        let store = InMemoryContentStore::new();
        let id1 = store.put(&doc(json!({"a": 1, "b": 2}))).unwrap();
        let id2 = store.put(&doc(json!({"b": 2, "a": 1}))).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn different_content_produces_different_ids() {
        let store = InMemoryContentStore::new();
        let id1 = store.put(&doc(json!({"a": 1}))).unwrap();
        let id2 = store.put(&doc(json!({"a": 2}))).unwrap();
        assert_ne!(id1, id2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_document_is_not_found() {
        let store = InMemoryContentStore::new();
        let cid = Cid::new("QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o").unwrap();
        let err = store.get(&cid).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref missing) if *missing == cid));
    }

    #[test]
    fn raw_values_are_stored() {
        let store = InMemoryContentStore::new();
        let cid = store.put_raw(&json!(["not", "an", "object"])).unwrap();
        assert_eq!(store.get(&cid).unwrap(), json!(["not", "an", "object"]));
    }

    #[test]
    fn round_trips_are_counted() {
        let store = InMemoryContentStore::new();
        let cid = store.put(&doc(json!({"x": 1}))).unwrap();
        assert_eq!(store.round_trips(), 0);
        store.get(&cid).unwrap();
        store.get(&cid).unwrap();
        assert_eq!(store.round_trips(), 2);
    }

    #[test]
    fn clear_removes_all() {
        let store = InMemoryContentStore::new();
        store.put(&doc(json!({"a": 1}))).unwrap();
        store.put(&doc(json!({"b": 1}))).unwrap();
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryContentStore::new());
        let cid = store.put(&doc(json!({"shared": true}))).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let cid = cid.clone();
                thread::spawn(move || {
                    assert_eq!(store.get(&cid).unwrap(), json!({"shared": true}));
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.round_trips(), 8);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryContentStore::new();
        store.put(&doc(json!({"x": 1}))).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryContentStore"));
        assert!(debug.contains("document_count"));
    }
}
