//! Key canonicalization (spec.md §4.2 "Key normalizer").

use std::collections::HashSet;
use std::sync::RwLock;

use converge_types::{looks_like_content_id, Value};

/// The table of names that render as [`Value::Symbol`] rather than a plain
/// byte string (spec.md §4.2: "the symbol form if one with the lowercased
/// textual representation already exists in the symbol table").
///
/// Seeded with the reserved protocol keys (spec.md §6); devices may
/// register additional symbol names at load time.
pub struct SymbolTable {
    known: RwLock<HashSet<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut known = HashSet::new();
        for reserved in converge_types::reserved::ALL {
            known.insert(reserved.to_ascii_lowercase());
        }
        Self {
            known: RwLock::new(known),
        }
    }

    pub fn register(&self, name: impl Into<String>) {
        let mut known = self.known.write().unwrap_or_else(|e| e.into_inner());
        known.insert(name.into().to_ascii_lowercase());
    }

    pub fn contains(&self, name: &str) -> bool {
        let known = self.known.read().unwrap_or_else(|e| e.into_inner());
        known.contains(&name.to_ascii_lowercase())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonicalizes a raw key term (spec.md §4.2 `to_key`).
///
/// Returns `None` (the spec's `undefined` sentinel) when `value` is not
/// textual; callers decide whether that is fatal.
pub fn to_key(value: &Value, symbols: &SymbolTable) -> Option<Value> {
    let text = value.as_text()?;
    if looks_like_content_id(text) {
        return Some(value.clone());
    }
    let lower = text.to_ascii_lowercase();
    if symbols.contains(&lower) {
        Some(Value::Symbol(lower))
    } else {
        Some(Value::text(lower))
    }
}

/// The canonical byte-string form, always (spec.md §4.2 `key_to_binary`).
pub fn key_to_binary(value: &Value) -> Option<Vec<u8>> {
    value
        .as_text()
        .map(|t| t.to_ascii_lowercase().into_bytes())
}

/// The canonical lowercase string form used as a `Message` field lookup
/// key and dispatch handler name.
pub fn to_key_string(value: &Value) -> Option<String> {
    value.as_text().map(|t| t.to_ascii_lowercase())
}
