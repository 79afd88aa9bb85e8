//! The value types a [`crate::Message`] may hold (spec.md §3 "Message").

use serde::{Deserialize, Serialize};

use crate::Message;

/// A value stored under a message key.
///
/// Values are either sub-messages, raw scalars, or ordered sequences of
/// such values, as specified. `Float` carries `PartialEq` but not `Eq`
/// (NaN), which is acceptable here: resolver equality checks (cache hits,
/// dedup group keys) compare encoded bytes, not `Value` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// An opaque byte string. The canonical scalar form for textual keys
    /// and most payloads (spec.md §4.2).
    Bytes(Vec<u8>),
    /// A signed integer scalar.
    Int(i64),
    /// A floating-point scalar.
    Float(f64),
    /// A boolean scalar.
    Bool(bool),
    /// A symbol: an atom rendered from a canonical key when one exists in
    /// the symbol table (spec.md §4.2).
    Symbol(String),
    /// A nested sub-message.
    Message(Message),
    /// An ordered sequence of values, e.g. a path or a list-shaped result.
    List(Vec<Value>),
}

impl Value {
    /// Convenience constructor for a UTF-8 string scalar.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Bytes(s.into().into_bytes())
    }

    /// Returns the UTF-8 text this value carries, if it is byte- or
    /// symbol-shaped and valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the inner message if this value is message-shaped.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the inner list if this value is list-shaped.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// `true` for any non-message, non-list value — the scalars that
    /// bypass hashpath linking (spec.md §4.7 stage 6).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Message(_))
    }

    /// Deterministic byte encoding used for hashpath commitments and cache
    /// keys. Length-prefixed per field, the same convention
    /// `converge-crypto::blake3` documents for multi-field domain
    /// separation.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bytes(b) => tag_and_len(0, b),
            Value::Int(i) => tag_and_len(1, &i.to_le_bytes()),
            Value::Float(f) => tag_and_len(2, &f.to_le_bytes()),
            Value::Bool(b) => tag_and_len(3, &[*b as u8]),
            Value::Symbol(s) => tag_and_len(4, s.as_bytes()),
            Value::Message(m) => tag_and_len(5, &m.canonical_bytes()),
            Value::List(items) => {
                let mut buf = vec![6u8];
                buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
                for item in items {
                    let encoded = item.canonical_bytes();
                    buf.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
                    buf.extend_from_slice(&encoded);
                }
                buf
            }
        }
    }
}

fn tag_and_len(tag: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 4 + data.len());
    buf.push(tag);
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
    buf
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Message> for Value {
    fn from(m: Message) -> Self {
        Value::Message(m)
    }
}
