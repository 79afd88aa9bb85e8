//! The message mapping (spec.md §3 "Message").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{reserved, Hashpath, Key, Value};

/// A mapping from canonicalized keys to values.
///
/// Messages are immutable values: every "mutation" in this crate and in
/// `converge-resolver` produces a new `Message` rather than editing one in
/// place, per spec.md §3 "Lifecycle". Backed by a `BTreeMap` so key
/// iteration order is deterministic, which canonical-byte encoding (used
/// for hashpath commitments) depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    fields: BTreeMap<Key, Value>,
}

impl Message {
    /// An empty message.
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Builds a message from an iterator of already-canonicalized
    /// `(key, value)` pairs.
    pub fn from_fields(fields: impl IntoIterator<Item = (Key, Value)>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Returns the value at `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a new message with `key` set to `value`, leaving `self`
    /// unchanged (messages are immutable values).
    #[must_use]
    pub fn with(&self, key: impl Into<Key>, value: Value) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(key.into(), value);
        Self { fields }
    }

    /// Returns a new message with `key` removed, leaving `self` unchanged.
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        let mut fields = self.fields.clone();
        fields.remove(key);
        Self { fields }
    }

    /// `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// An iterator over `(key, value)` pairs in canonical (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.fields.iter()
    }

    /// All keys, in canonical (sorted) order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.fields.keys()
    }

    /// All keys excluding the reserved protocol keys (spec.md §4.9
    /// `keys(msg, opts, "remove")`).
    pub fn keys_excluding_reserved(&self) -> impl Iterator<Item = &Key> {
        self.fields
            .keys()
            .filter(|k| !reserved::ALL.contains(&k.as_str()))
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` if the message has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The raw `device` field, if declared (spec.md §3).
    pub fn device(&self) -> Option<&Value> {
        self.get(reserved::DEVICE)
    }

    /// `true` if the message declares a `device` field at all (spec.md §4.4
    /// rule 1).
    pub fn has_device(&self) -> bool {
        self.contains(reserved::DEVICE)
    }

    /// The raw `path` field, if present.
    pub fn path_field(&self) -> Option<&Value> {
        self.get(reserved::PATH)
    }

    /// The message's hashpath witness, if any (spec.md §3 "Hashpath").
    pub fn hashpath(&self) -> Option<Hashpath> {
        match self.get(reserved::HASHPATH)? {
            Value::Bytes(b) if b.len() == 32 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(b);
                Some(Hashpath::from_bytes(out))
            }
            _ => None,
        }
    }

    /// Returns a new message with the `hashpath` field set.
    #[must_use]
    pub fn with_hashpath(&self, hp: Hashpath) -> Self {
        self.with(reserved::HASHPATH, Value::Bytes(hp.into_bytes().to_vec()))
    }

    /// Returns a new message with the `hashpath` field stripped, used
    /// before applying a patch (spec.md §4.9 `set(msg, patch)`).
    #[must_use]
    pub fn without_hashpath(&self) -> Self {
        self.without(reserved::HASHPATH)
    }

    /// Deterministic byte encoding of the whole message, used for hashpath
    /// commitments (spec.md §3 "Hashpath") and cache keys.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.fields.len() as u32).to_le_bytes());
        for (key, value) in &self.fields {
            let key_bytes = key.as_bytes();
            buf.extend_from_slice(&(key_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(key_bytes);
            let value_bytes = value.canonical_bytes();
            buf.extend_from_slice(&(value_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(&value_bytes);
        }
        buf
    }
}

impl FromIterator<(Key, Value)> for Message {
    fn from_iter<T: IntoIterator<Item = (Key, Value)>>(iter: T) -> Self {
        Self::from_fields(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_and_without_are_immutable() {
        let m0 = Message::new();
        let m1 = m0.with("a", Value::Int(1));
        assert!(m0.get("a").is_none());
        assert_eq!(m1.get("a"), Some(&Value::Int(1)));
        let m2 = m1.without("a");
        assert!(m2.get("a").is_none());
        assert_eq!(m1.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn keys_excluding_reserved_filters_device_and_path() {
        let m = Message::new()
            .with("a", Value::Int(1))
            .with(reserved::DEVICE, Value::text("message@1.0"))
            .with(reserved::PATH, Value::List(vec![]));
        let keys: Vec<_> = m.keys_excluding_reserved().cloned().collect();
        assert_eq!(keys, vec!["a".to_string()]);
    }

    #[test]
    fn canonical_bytes_order_independent_of_insert_order() {
        let m1 = Message::new().with("b", Value::Int(2)).with("a", Value::Int(1));
        let m2 = Message::new().with("a", Value::Int(1)).with("b", Value::Int(2));
        assert_eq!(m1.canonical_bytes(), m2.canonical_bytes());
    }

    #[test]
    fn hashpath_roundtrip() {
        let hp = Hashpath::from_bytes([7u8; 32]);
        let m = Message::new().with_hashpath(hp);
        assert_eq!(m.hashpath(), Some(hp));
        assert!(m.without_hashpath().hashpath().is_none());
    }
}
