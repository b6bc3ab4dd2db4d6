use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::TypeError;

/// Canonical prefix carried by every long-form identifier.
pub const IPFS_PREFIX: &str = "/ipfs/";

/// Characters allowed in the hash part of an identifier (base58btc).
///
/// The alphabet leaves out `0`, `O`, `I` and `l` so that no two characters
/// can be confused when read by a human.
pub const HASH_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Content identifier of a document held by a content-addressed store.
///
/// A `Cid` always holds the canonical long form `/ipfs/<hash>`. Construction
/// accepts either the bare hash or the long form and normalizes to the latter,
/// so `Cid::new(x)?.long() == Cid::new(Cid::new(x)?.long())?.long()`.
/// Equality, ordering and hashing are on the canonical string.
///
/// The hash length is decided by the store; only the alphabet is checked.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(String);

impl Cid {
    /// Validate and normalize an identifier.
    pub fn new(value: &str) -> Result<Self, TypeError> {
        if value.trim().is_empty() {
            return Err(TypeError::Empty);
        }

        let hash = match value.strip_prefix(IPFS_PREFIX) {
            Some(rest) => rest,
            None if value.contains('/') => {
                return Err(TypeError::InvalidPrefix(value.to_string()));
            }
            None => value,
        };

        if hash.is_empty() {
            return Err(TypeError::Empty);
        }

        if let Some((position, ch)) = hash
            .char_indices()
            .find(|(_, ch)| !is_hash_char(*ch))
        {
            return Err(TypeError::InvalidCharacter { ch, position });
        }

        Ok(Self(format!("{IPFS_PREFIX}{hash}")))
    }

    /// Validate an untyped JSON value as an identifier.
    ///
    /// Only JSON strings can be identifiers; everything else is rejected
    /// with [`TypeError::NotAString`].
    pub fn from_json(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::String(s) => Self::new(s),
            Value::Null => Err(TypeError::NotAString("null")),
            Value::Bool(_) => Err(TypeError::NotAString("boolean")),
            Value::Number(_) => Err(TypeError::NotAString("number")),
            Value::Array(_) => Err(TypeError::NotAString("array")),
            Value::Object(_) => Err(TypeError::NotAString("object")),
        }
    }

    /// The hash without the `/ipfs/` prefix.
    pub fn short(&self) -> &str {
        &self.0[IPFS_PREFIX.len()..]
    }

    /// The canonical `/ipfs/<hash>` form.
    pub fn long(&self) -> &str {
        &self.0
    }

    /// Abbreviated hash for log lines (first 8 characters).
    pub fn short_id(&self) -> &str {
        let short = self.short();
        &short[..short.len().min(8)]
    }

    /// The canonical form as a JSON string value.
    pub fn to_json(&self) -> Value {
        Value::String(self.0.clone())
    }
}

fn is_hash_char(ch: char) -> bool {
    ch.is_ascii() && HASH_ALPHABET.as_bytes().contains(&(ch as u8))
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.0)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Cid {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Cid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const HASH: &str = "QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o";

    #[test]
    fn bare_hash_is_prefixed() {
        let cid = Cid::new(HASH).unwrap();
        assert_eq!(cid.long(), format!("/ipfs/{HASH}"));
    }

    #[test]
    fn long_form_is_kept() {
        let cid = Cid::new(&format!("/ipfs/{HASH}")).unwrap();
        assert_eq!(cid.long(), format!("/ipfs/{HASH}"));
    }

    #[test]
    fn short_strips_prefix() {
        let cid = Cid::new(HASH).unwrap();
        assert_eq!(cid.short(), HASH);
    }

    #[test]
    fn display_is_long_form() {
        let cid = Cid::new(HASH).unwrap();
        assert_eq!(cid.to_string(), format!("/ipfs/{HASH}"));
        assert_eq!(format!("{cid:?}"), format!("Cid(/ipfs/{HASH})"));
    }

    #[test]
    fn bare_and_long_forms_are_equal() {
        let a = Cid::new(HASH).unwrap();
        let b = Cid::new(&format!("/ipfs/{HASH}")).unwrap();
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn differing_hashes_are_not_equal() {
        let a = Cid::new("QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o").unwrap();
        let b = Cid::new("QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5p").unwrap();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn no_fixed_length() {
        let minimal = format!("Qm{}", "1".repeat(44));
        assert!(Cid::new(&minimal).is_ok());
        assert!(Cid::new("z").is_ok());
    }

    #[test]
    fn short_id_is_truncated() {
        let cid = Cid::new(HASH).unwrap();
        assert_eq!(cid.short_id(), "QmT78zSu");
        assert_eq!(Cid::new("abc").unwrap().short_id(), "abc");
    }

    #[test]
    fn empty_and_whitespace_rejected() {
        assert_eq!(Cid::new(""), Err(TypeError::Empty));
        assert_eq!(Cid::new(" "), Err(TypeError::Empty));
        assert_eq!(Cid::new("  \t"), Err(TypeError::Empty));
        assert_eq!(Cid::new("/ipfs/"), Err(TypeError::Empty));
    }

    #[test]
    fn ambiguous_characters_rejected() {
        for bad in ['0', 'O', 'I', 'l'] {
            let candidate = format!("QmT78{}", bad.to_string().repeat(40));
            assert_eq!(
                Cid::new(&candidate),
                Err(TypeError::InvalidCharacter { ch: bad, position: 5 })
            );
        }
    }

    #[test]
    fn punctuation_and_spaces_rejected() {
        assert!(matches!(
            Cid::new("QmInvalidCharacters!@#$%^&*()"),
            Err(TypeError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            Cid::new("this cid is invalid"),
            Err(TypeError::InvalidCharacter { ch: ' ', .. })
        ));
        assert!(matches!(
            Cid::new(&format!(" {HASH}")),
            Err(TypeError::InvalidCharacter { ch: ' ', position: 0 })
        ));
    }

    #[test]
    fn foreign_prefix_rejected() {
        let err = Cid::new(&format!("/notipfs/{HASH}")).unwrap_err();
        assert!(matches!(err, TypeError::InvalidPrefix(_)));
        assert!(matches!(
            Cid::new(&format!("ipfs/{HASH}")),
            Err(TypeError::InvalidPrefix(_))
        ));
        assert!(matches!(
            Cid::new(&format!("/ipns/{HASH}")),
            Err(TypeError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn non_string_json_rejected() {
        assert_eq!(Cid::from_json(&json!(null)), Err(TypeError::NotAString("null")));
        assert_eq!(Cid::from_json(&json!(123)), Err(TypeError::NotAString("number")));
        assert_eq!(Cid::from_json(&json!(3.14)), Err(TypeError::NotAString("number")));
        assert_eq!(Cid::from_json(&json!(true)), Err(TypeError::NotAString("boolean")));
        assert_eq!(Cid::from_json(&json!([])), Err(TypeError::NotAString("array")));
        assert_eq!(Cid::from_json(&json!({})), Err(TypeError::NotAString("object")));
        assert!(Cid::from_json(&json!(HASH)).is_ok());
    }

    #[test]
    fn serde_uses_long_form() {
        let cid = Cid::new(HASH).unwrap();
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"/ipfs/{HASH}\""));
        let parsed: Cid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cid);
    }

    #[test]
    fn serde_rejects_invalid() {
        let result: Result<Cid, _> = serde_json::from_str("\"/ipfs/0000\"");
        assert!(result.is_err());
    }

    #[test]
    fn from_str_and_try_from() {
        let a: Cid = HASH.parse().unwrap();
        let b = Cid::try_from(HASH.to_string()).unwrap();
        assert_eq!(a, b);
        assert_eq!(String::from(a), format!("/ipfs/{HASH}"));
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(hash in "[1-9A-HJ-NP-Za-km-z]{1,64}") {
            let once = Cid::new(&hash).unwrap();
            let twice = Cid::new(once.long()).unwrap();
            prop_assert_eq!(once.long(), twice.long());
            prop_assert_eq!(once.short(), hash.as_str());
            let prefixed = Cid::new(&format!("/ipfs/{hash}")).unwrap();
            prop_assert_eq!(prefixed.long(), once.long());
        }
    }
}
