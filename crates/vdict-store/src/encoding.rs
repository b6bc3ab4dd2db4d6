//! Canonical document encoding and identity derivation.
//!
//! Two documents with the same content must encode to the same bytes no
//! matter how their keys were ordered in memory. Objects are therefore
//! re-emitted with keys sorted (recursively) and serialized as compact JSON.
//! The in-memory store derives identities from these bytes; the daemon
//! store sends them as the file body.

use cid::multibase::Base;
use cid::Cid as ContentId;
use multihash::Multihash;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::traits::Document;

/// Multihash code for BLAKE3.
const MULTIHASH_BLAKE3: u64 = 0x1e;
/// Multicodec for JSON payloads.
const JSON_CODEC: u64 = 0x0200;

/// Return a copy of `value` with every object's keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Encode a document to its canonical byte form.
pub fn encode_document(document: &Document) -> StoreResult<Vec<u8>> {
    let canonical = canonicalize(&Value::Object(document.clone()));
    serde_json::to_vec(&canonical).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode a stored payload back into a JSON value.
pub fn decode_value(bytes: &[u8]) -> StoreResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Derive the hash part of an identity from canonical bytes.
///
/// The result is a CIDv1 (JSON codec, BLAKE3 multihash) rendered in
/// base58btc, so it always passes identifier validation.
pub fn content_hash(bytes: &[u8]) -> StoreResult<String> {
    let digest = blake3::hash(bytes);
    let multihash = Multihash::wrap(MULTIHASH_BLAKE3, digest.as_bytes())
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    ContentId::new_v1(JSON_CODEC, multihash)
        .to_string_of_base(Base::Base58Btc)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}
