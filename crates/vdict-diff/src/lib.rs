//! Diff engine for versioned dictionaries.
//!
//! Compares the fields of a dictionary against those of its immediate
//! predecessor and reports, per field, the value it had before (if any) and
//! the value it has now.
//!
//! # Key Types
//!
//! - [`Fields`] -- Ordered field map (`IndexMap<String, Value>`)
//! - [`ChangeSet`] / [`FieldChange`] -- Per-field `{old?, new}` records

pub mod field_diff;

pub use field_diff::{diff_fields, ChangeSet, FieldChange, Fields};
