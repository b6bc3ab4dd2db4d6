//! Field-level diff: compare a dictionary with its predecessor.
//!
//! Fields are represented as `IndexMap<String, serde_json::Value>`. The diff
//! is asymmetric: it reports fields that are new or whose value
//! changed, and ignores fields that only the predecessor had.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Ordered mapping from field name to JSON value.
pub type Fields = IndexMap<String, Value>;

/// What happened to one field between two versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Value in the predecessor; `None` when the field is new.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    /// Value now.
    pub new: Value,
}

impl FieldChange {
    pub fn added(new: Value) -> Self {
        Self { old: None, new }
    }

    pub fn modified(old: Value, new: Value) -> Self {
        Self {
            old: Some(old),
            new,
        }
    }

    /// Returns `true` if the predecessor did not have this field.
    pub fn is_added(&self) -> bool {
        self.old.is_none()
    }
}

/// The result of comparing a dictionary with its predecessor.
///
/// Serializes as a flat object: `{"field": {"old": .., "new": ..}, ...}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: IndexMap<String, FieldChange>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    /// Changes in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldChange)> {
        self.changes.iter()
    }

    /// Number of fields the predecessor did not have.
    pub fn added(&self) -> usize {
        self.changes.values().filter(|c| c.is_added()).count()
    }

    /// Number of fields whose value changed.
    pub fn modified(&self) -> usize {
        self.changes.values().filter(|c| !c.is_added()).count()
    }

    fn insert(&mut self, field: &str, change: FieldChange) {
        self.changes.insert(field.to_string(), change);
    }
}

impl IntoIterator for ChangeSet {
    type Item = (String, FieldChange);
    type IntoIter = indexmap::map::IntoIter<String, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Compute the changes from `previous` to `current`.
///
/// Without a predecessor every current field is reported as added. With
/// one, fields present in both with different values are reported first
/// (in the predecessor's order), then fields only `current` has (in its
/// order). Fields only the predecessor has are not reported.
pub fn diff_fields(previous: Option<&Fields>, current: &Fields) -> ChangeSet {
    let mut changes = ChangeSet::new();

    let Some(previous) = previous else {
        for (field, value) in current {
            changes.insert(field, FieldChange::added(value.clone()));
        }
        return changes;
    };

    for (field, old) in previous {
        if let Some(new) = current.get(field) {
            if !values_equal(old, new) {
                changes.insert(field, FieldChange::modified(old.clone(), new.clone()));
            }
        }
    }

    for (field, new) in current {
        if !previous.contains_key(field) {
            changes.insert(field, FieldChange::added(new.clone()));
        }
    }

    changes
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`.
///
/// Two integers compare exactly. An integer equals a float only when the
/// float holds exactly that integer.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (x.is_f64(), y.is_f64()) {
        (false, false) => x == y,
        (true, true) => x.as_f64() == y.as_f64(),
        (true, false) => float_equals_integer(x, y),
        (false, true) => float_equals_integer(y, x),
    }
}

fn float_equals_integer(float: &Number, integer: &Number) -> bool {
    let Some(f) = float.as_f64() else {
        return false;
    };
    if f.fract() != 0.0 {
        return false;
    }
    // Outside the i64/u64 ranges the casts saturate, so bound first.
    if let Some(i) = integer.as_i64() {
        f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 && f as i64 == i
    } else if let Some(u) = integer.as_u64() {
        f >= 0.0 && f < 18_446_744_073_709_551_616.0 && f as u64 == u
    } else {
        false
    }
}
