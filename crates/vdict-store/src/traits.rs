use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use vdict_types::Cid;

use crate::error::{StoreError, StoreResult};
use crate::finite::to_finite_value;

/// A flat JSON object as it is persisted in the store.
pub type Document = Map<String, Value>;

/// Content-addressed document store.
///
/// All implementations must satisfy these invariants:
/// - Documents are immutable once written: an identity always resolves to
///   the same content.
/// - The identity returned by `put` is assigned by the store; callers adopt
///   it as-is.
/// - Calls block until the store answers. Retries and timeouts are the
///   backend's own policy, never the caller's.
/// - All failures are propagated, never silently ignored.
pub trait ContentStore: Send + Sync {
    /// Publish a document and return the identity it is stored under.
    ///
    /// Writing content that is already present is a no-op that returns the
    /// existing identity.
    fn put(&self, document: &Document) -> StoreResult<Cid>;

    /// Resolve the JSON value published under `cid`.
    ///
    /// Returns [`StoreError::NotFound`] when nothing is published there.
    /// The value is not required to be an object; shape checks belong to
    /// the caller.
    fn get(&self, cid: &Cid) -> StoreResult<Value>;

    /// Serialize any value to a JSON object and publish it.
    ///
    /// Values that do not serialize to a JSON object, or that contain a
    /// `NaN` or infinite number, are rejected with
    /// [`StoreError::Serialization`].
    fn put_value<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Cid>
    where
        Self: Sized,
    {
        match to_finite_value(value) {
            Ok(Value::Object(document)) => self.put(&document),
            Ok(other) => Err(StoreError::Serialization(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(StoreError::Serialization(e.to_string())),
        }
    }
}

impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    fn put(&self, document: &Document) -> StoreResult<Cid> {
        (**self).put(document)
    }

    fn get(&self, cid: &Cid) -> StoreResult<Value> {
        (**self).get(cid)
    }
}

impl<S: ContentStore + ?Sized> ContentStore for &S {
    fn put(&self, document: &Document) -> StoreResult<Cid> {
        (**self).put(document)
    }

    fn get(&self, cid: &Cid) -> StoreResult<Value> {
        (**self).get(cid)
    }
}

/// Human-readable name of a JSON value's type, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
