//! Chained dictionaries: every saved version points at its predecessor.
//!
//! # Invariants
//!
//! - The document for generation *n* stores generation *n-1*'s identity in
//!   `previous_cid`, or `null` for generation 0.
//! - History is append-only and backward-linked. Published versions are
//!   never rewritten; a new save only ever adds a node.
//! - Walking the history costs one store round trip per step (fewer with a
//!   [`CachedStore`](vdict_store::CachedStore)), and `max_depth` bounds it.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use vdict_diff::{diff_fields, ChangeSet, Fields};
use vdict_store::{ContentStore, Document};
use vdict_types::Cid;

use crate::dict::{fetch_document, to_document, SharedStore, VersionedDict};
use crate::error::{DictError, DictResult};

/// Field under which a chain document records its predecessor.
pub const PREVIOUS_CID: &str = "previous_cid";

/// Field names callers may not set on a chain.
pub const RESERVED_FIELDS: &[&str] = &[PREVIOUS_CID];

/// One historical version, as resolved from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Ancestor {
    pub cid: Cid,
    pub previous_cid: Option<Cid>,
    /// Non-reserved fields.
    pub fields: Fields,
}

impl Ancestor {
    /// Resolve and validate the chain document published under `cid`.
    ///
    /// A missing or `null` `previous_cid` means generation 0; any other
    /// non-identity value makes the document malformed.
    pub fn fetch(store: &dyn ContentStore, cid: &Cid) -> DictResult<Self> {
        let mut document = fetch_document(store, cid)?;
        let previous_cid = take_previous(&mut document, cid)?;
        Ok(Self {
            cid: cid.clone(),
            previous_cid,
            fields: document.into_iter().collect(),
        })
    }

    /// Full field set including `previous_cid` (`null` when absent).
    pub fn state(&self) -> Fields {
        with_previous(&self.fields, self.previous_cid.as_ref())
    }
}

/// Lazy backward walk over a chain's history, most recent first.
///
/// Each call to `next` performs one `get`. The walk ends after the first
/// ancestor without a predecessor, or right after an error.
pub struct Lineage<'a> {
    store: &'a dyn ContentStore,
    next: Option<Cid>,
}

impl<'a> Lineage<'a> {
    /// Walk backward starting at (and including) `start`.
    pub fn new(store: &'a dyn ContentStore, start: Option<Cid>) -> Self {
        Self { store, next: start }
    }
}

impl Iterator for Lineage<'_> {
    type Item = DictResult<Ancestor>;

    fn next(&mut self) -> Option<Self::Item> {
        let cid = self.next.take()?;
        let ancestor = match Ancestor::fetch(self.store, &cid) {
            Ok(ancestor) => ancestor,
            Err(e) => return Some(Err(e)),
        };
        debug!(
            cid = %cid.short_id(),
            has_previous = ancestor.previous_cid.is_some(),
            "walked lineage step"
        );
        self.next = ancestor.previous_cid.clone();
        Some(Ok(ancestor))
    }
}

/// A [`VersionedDict`] that remembers the identity it had before each save.
///
/// ```text
/// Fresh --save--> Saved(cid0, previous=None) --save--> Saved(cid1, previous=cid0) --> ...
/// ```
///
/// Opening an existing identity lands directly in `Saved` with whatever
/// predecessor that document recorded.
#[derive(Clone, Debug)]
pub struct VersionedDictChain {
    dict: VersionedDict,
    previous_cid: Option<Cid>,
}

impl VersionedDictChain {
    /// A fresh chain: no identity, no predecessor.
    pub fn new(store: SharedStore) -> Self {
        Self {
            dict: VersionedDict::new(store),
            previous_cid: None,
        }
    }

    /// Load the chain version published under `cid`.
    pub fn open(store: SharedStore, cid: &Cid) -> DictResult<Self> {
        let mut chain = Self::new(store);
        chain.load(cid)?;
        Ok(chain)
    }

    pub fn open_str(store: SharedStore, cid: &str) -> DictResult<Self> {
        Self::open(store, &Cid::new(cid)?)
    }

    pub fn store(&self) -> &SharedStore {
        self.dict.store()
    }

    pub fn identity(&self) -> Option<&Cid> {
        self.dict.identity()
    }

    /// Identity this chain had before its most recent save.
    pub fn previous_cid(&self) -> Option<&Cid> {
        self.previous_cid.as_ref()
    }

    /// Non-reserved fields in insertion order.
    pub fn fields(&self) -> &Fields {
        self.dict.fields()
    }

    pub fn items(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.dict.items()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.dict.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dict.contains(name)
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Set a field, returning its previous value.
    ///
    /// Reserved names are rejected with [`DictError::ReservedField`].
    pub fn set<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> DictResult<Option<Value>> {
        let name = name.into();
        check_reserved(&name)?;
        self.dict.set(name, value)
    }

    /// Remove a field, returning its value. Reserved names are rejected.
    pub fn remove(&mut self, name: &str) -> DictResult<Option<Value>> {
        check_reserved(name)?;
        Ok(self.dict.remove(name))
    }

    /// Fields plus `previous_cid` (`null` when absent).
    pub fn state(&self) -> Fields {
        with_previous(self.dict.fields(), self.previous_cid.as_ref())
    }

    /// The document `save()` would publish right now.
    ///
    /// Its `previous_cid` is the current identity, since that is what the
    /// next save records.
    pub fn document(&self) -> Document {
        to_document(&with_previous(self.dict.fields(), self.dict.identity()))
    }

    /// Publish a new version pointing at the current identity.
    ///
    /// On failure neither the identity nor `previous_cid` changes.
    pub fn save(&mut self) -> DictResult<Cid> {
        let previous = self.dict.identity().cloned();
        let document = self.document();
        let cid = self.dict.publish(&document)?;
        self.previous_cid = previous;
        Ok(cid)
    }

    /// Replace this chain's state with the version published under `cid`.
    ///
    /// The document is fully resolved and validated before any state
    /// changes.
    pub fn load(&mut self, cid: &Cid) -> DictResult<()> {
        let ancestor = Ancestor::fetch(self.dict.store().as_ref(), cid)?;
        debug!(
            cid = %cid.short_id(),
            fields = ancestor.fields.len(),
            "loaded chain version"
        );
        self.dict.adopt(ancestor.cid, ancestor.fields);
        self.previous_cid = ancestor.previous_cid;
        Ok(())
    }

    pub fn load_str(&mut self, cid: &str) -> DictResult<()> {
        self.load(&Cid::new(cid)?)
    }

    /// Per-field changes since the predecessor.
    ///
    /// `previous_cid` always takes part in the comparison. Without a
    /// predecessor every field is reported as new. Fields that only the
    /// predecessor has are not reported.
    pub fn changes(&self) -> DictResult<ChangeSet> {
        let current = self.state();
        match &self.previous_cid {
            None => Ok(diff_fields(None, &current)),
            Some(previous) => {
                let ancestor = Ancestor::fetch(self.dict.store().as_ref(), previous)?;
                Ok(diff_fields(Some(&ancestor.state()), &current))
            }
        }
    }

    /// Walk the history backward from the predecessor.
    pub fn lineage(&self) -> Lineage<'_> {
        Lineage::new(self.dict.store().as_ref(), self.previous_cid.clone())
    }

    /// Full states of up to `max_depth` ancestors, most recent first.
    ///
    /// `None` walks to generation 0. Any failed step aborts the walk.
    pub fn previous_states(&self, max_depth: Option<usize>) -> DictResult<Vec<Fields>> {
        self.lineage()
            .take(max_depth.unwrap_or(usize::MAX))
            .map(|step| step.map(|ancestor| ancestor.state()))
            .collect()
    }

    /// Identities of up to `max_depth` ancestors, most recent first.
    ///
    /// Same walk as [`previous_states`](Self::previous_states).
    pub fn previous_cids(&self, max_depth: Option<usize>) -> DictResult<Vec<Cid>> {
        self.lineage()
            .take(max_depth.unwrap_or(usize::MAX))
            .map(|step| step.map(|ancestor| ancestor.cid))
            .collect()
    }

    pub fn into_dict(self) -> VersionedDict {
        self.dict
    }
}

fn check_reserved(name: &str) -> DictResult<()> {
    if RESERVED_FIELDS.contains(&name) {
        return Err(DictError::ReservedField(name.to_string()));
    }
    Ok(())
}

fn take_previous(document: &mut Document, cid: &Cid) -> DictResult<Option<Cid>> {
    match document.remove(PREVIOUS_CID) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Cid::from_json(&value)
            .map(Some)
            .map_err(|e| DictError::MalformedSnapshot {
                cid: cid.clone(),
                reason: format!("invalid {PREVIOUS_CID}: {e}"),
            }),
    }
}

fn with_previous(fields: &Fields, previous: Option<&Cid>) -> Fields {
    let mut state = Fields::with_capacity(fields.len() + 1);
    state.insert(
        PREVIOUS_CID.to_string(),
        previous.map_or(Value::Null, Cid::to_json),
    );
    for (name, value) in fields {
        state.insert(name.clone(), value.clone());
    }
    state
}
