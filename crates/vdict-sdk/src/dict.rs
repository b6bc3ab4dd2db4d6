use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use vdict_diff::Fields;
use vdict_store::{json_kind, to_finite_value, ContentStore, Document};
use vdict_types::Cid;

use crate::error::{DictError, DictResult};

/// Store handle shared by every dictionary that reads or writes through it.
pub type SharedStore = Arc<dyn ContentStore>;

/// An ordered set of named JSON fields persisted as one store document.
///
/// The dictionary has no identity until it is saved or loaded. After
/// `save()` the identity is whatever the store returned; after `load(cid)`
/// the fields are exactly the stored document and the identity is `cid`.
/// The store never modifies the fields, only the caller does.
///
/// Not synchronized: mutate one instance from one thread at a time.
#[derive(Clone)]
pub struct VersionedDict {
    store: SharedStore,
    identity: Option<Cid>,
    fields: Fields,
}

impl VersionedDict {
    /// An empty dictionary with no identity.
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            identity: None,
            fields: Fields::new(),
        }
    }

    /// Load the dictionary published under `cid`.
    pub fn open(store: SharedStore, cid: &Cid) -> DictResult<Self> {
        let mut dict = Self::new(store);
        dict.load(cid)?;
        Ok(dict)
    }

    /// Like [`open`](Self::open), validating an untyped identity first.
    pub fn open_str(store: SharedStore, cid: &str) -> DictResult<Self> {
        Self::open(store, &Cid::new(cid)?)
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Current identity, absent until the first save or load.
    pub fn identity(&self) -> Option<&Cid> {
        self.identity.as_ref()
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn items(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Set a field, returning its previous value.
    ///
    /// Fails with [`DictError::Serialization`] if `value` has no JSON
    /// representation (a map with non-string keys, or a `NaN` or infinite
    /// number anywhere inside it). The field is left untouched then.
    pub fn set<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> DictResult<Option<Value>> {
        let value = to_json(value)?;
        Ok(self.fields.insert(name.into(), value))
    }

    /// Remove a field, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    /// The document `save()` would publish.
    pub fn document(&self) -> Document {
        to_document(&self.fields)
    }

    /// Publish the fields and adopt the returned identity.
    ///
    /// On failure the identity is unchanged and the fields are kept, so the
    /// save can be retried.
    pub fn save(&mut self) -> DictResult<Cid> {
        self.publish(&self.document())
    }

    /// Replace all fields with the document published under `cid`.
    ///
    /// Fails with [`DictError::MalformedSnapshot`] if the document is not a
    /// JSON object. The document is fully resolved and checked before any
    /// state changes, so a failed load leaves the dictionary as it was.
    pub fn load(&mut self, cid: &Cid) -> DictResult<()> {
        let document = fetch_document(self.store.as_ref(), cid)?;
        debug!(cid = %cid.short_id(), fields = document.len(), "loaded dictionary");
        self.adopt(cid.clone(), document.into_iter().collect());
        Ok(())
    }

    /// Like [`load`](Self::load), validating an untyped identity first.
    pub fn load_str(&mut self, cid: &str) -> DictResult<()> {
        self.load(&Cid::new(cid)?)
    }

    pub(crate) fn publish(&mut self, document: &Document) -> DictResult<Cid> {
        let cid = self.store.put(document)?;
        info!(cid = %cid.short_id(), fields = document.len(), "saved dictionary");
        self.identity = Some(cid.clone());
        Ok(cid)
    }

    pub(crate) fn adopt(&mut self, cid: Cid, fields: Fields) {
        self.identity = Some(cid);
        self.fields = fields;
    }
}

impl std::fmt::Debug for VersionedDict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedDict")
            .field("identity", &self.identity)
            .field("fields", &self.fields)
            .finish()
    }
}

pub(crate) fn to_json<T: Serialize>(value: T) -> DictResult<Value> {
    to_finite_value(&value).map_err(|e| DictError::Serialization(e.to_string()))
}

pub(crate) fn to_document(fields: &Fields) -> Document {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Resolve `cid` and insist that it holds a JSON object.
pub(crate) fn fetch_document(store: &dyn ContentStore, cid: &Cid) -> DictResult<Document> {
    match store.get(cid)? {
        Value::Object(document) => Ok(document),
        other => Err(DictError::MalformedSnapshot {
            cid: cid.clone(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use vdict_store::{InMemoryContentStore, StoreError};

    fn store() -> Arc<InMemoryContentStore> {
        Arc::new(InMemoryContentStore::new())
    }

    #[test]
    fn new_dict_is_empty_without_identity() {
        let dict = VersionedDict::new(store());
        assert!(dict.is_empty());
        assert!(dict.identity().is_none());
    }

    #[test]
    fn set_get_remove_keep_order() {
        let mut dict = VersionedDict::new(store());
        dict.set("b", 1).unwrap();
        dict.set("a", "two").unwrap();
        dict.set("c", json!({"nested": [1, 2]})).unwrap();
        assert_eq!(dict.set("b", 10).unwrap(), Some(json!(1)));

        let names: Vec<&String> = dict.items().map(|(k, _)| k).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(dict.get("b"), Some(&json!(10)));

        assert_eq!(dict.remove("b"), Some(json!(10)));
        let names: Vec<&String> = dict.items().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(dict.remove("missing"), None);
    }

    #[test]
    fn unrepresentable_value_is_rejected() {
        let mut dict = VersionedDict::new(store());
        let mut map = HashMap::new();
        map.insert((1, 2), 3);
        let err = dict.set("bad", map).unwrap_err();
        assert!(matches!(err, DictError::Serialization(_)));
        assert!(!dict.contains("bad"));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut dict = VersionedDict::new(store());
        dict.set("x", 1.5).unwrap();

        let err = dict.set("x", f64::NAN).unwrap_err();
        assert!(matches!(err, DictError::Serialization(_)));
        let err = dict.set("y", vec![f64::INFINITY]).unwrap_err();
        assert!(matches!(err, DictError::Serialization(_)));

        assert_eq!(dict.get("x"), Some(&json!(1.5)));
        assert!(!dict.contains("y"));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn save_adopts_store_identity() {
        let backing = store();
        let mut dict = VersionedDict::new(backing.clone());
        dict.set("key", "value").unwrap();
        let cid = dict.save().unwrap();
        assert_eq!(dict.identity(), Some(&cid));
        assert!(backing.contains(&cid));
        assert_eq!(dict.get("key"), Some(&json!("value")));
    }

    #[test]
    fn save_load_roundtrip() {
        let backing = store();
        let mut dict = VersionedDict::new(backing.clone());
        dict.set("name", "ada").unwrap();
        dict.set("tags", vec!["math", "engines"]).unwrap();
        dict.set("meta", json!({"born": 1815, "ratio": 0.5, "alive": false, "note": null}))
            .unwrap();
        let cid = dict.save().unwrap();

        let loaded = VersionedDict::open(backing, &cid).unwrap();
        assert_eq!(loaded.fields(), dict.fields());
        assert_eq!(loaded.identity(), Some(&cid));
    }

    #[test]
    fn different_content_gets_a_new_identity() {
        let mut dict = VersionedDict::new(store());
        dict.set("a", 1).unwrap();
        let first = dict.save().unwrap();
        dict.set("a", 2).unwrap();
        let second = dict.save().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn load_replaces_all_fields() {
        let backing = store();
        let mut source = VersionedDict::new(backing.clone());
        source.set("only", true).unwrap();
        let cid = source.save().unwrap();

        let mut target = VersionedDict::new(backing);
        target.set("stale", 1).unwrap();
        target.load(&cid).unwrap();
        assert!(!target.contains("stale"));
        assert_eq!(target.get("only"), Some(&json!(true)));
    }

    #[test]
    fn load_normalizes_short_identity() {
        let backing = store();
        let mut source = VersionedDict::new(backing.clone());
        source.set("x", 1).unwrap();
        let cid = source.save().unwrap();

        let loaded = VersionedDict::open_str(backing, cid.short()).unwrap();
        assert_eq!(loaded.identity(), Some(&cid));
    }

    #[test]
    fn load_rejects_bad_identity_string() {
        let mut dict = VersionedDict::new(store());
        let err = dict.load_str("/notipfs/abc").unwrap_err();
        assert!(matches!(err, DictError::InvalidIdentity(_)));
        assert!(matches!(
            dict.load_str("").unwrap_err(),
            DictError::InvalidIdentity(_)
        ));
    }

    #[test]
    fn load_of_non_object_is_malformed() {
        let backing = store();
        let cid = backing.put_raw(&json!([1, 2, 3])).unwrap();
        let mut dict = VersionedDict::new(backing);
        dict.set("kept", 1).unwrap();

        let err = dict.load(&cid).unwrap_err();
        assert!(matches!(err, DictError::MalformedSnapshot { .. }));
        assert!(dict.identity().is_none());
        assert_eq!(dict.get("kept"), Some(&json!(1)));
    }

    #[test]
    fn load_of_missing_document_is_not_found() {
        let mut dict = VersionedDict::new(store());
        let cid = Cid::new("QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o").unwrap();
        let err = dict.load(&cid).unwrap_err();
        assert!(matches!(err, DictError::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn debug_shows_identity_and_fields() {
        let mut dict = VersionedDict::new(store());
        dict.set("k", "v").unwrap();
        let debug = format!("{dict:?}");
        assert!(debug.contains("VersionedDict"));
        assert!(debug.contains("identity: None"));
    }
}
