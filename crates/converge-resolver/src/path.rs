//! Path algebra (spec.md §4.1).
//!
//! The plain [`converge_types::Path`] container lives in `converge-types`;
//! this module adds the operations that need the hashpath commit function
//! from `converge-crypto`. All functions here are pure.

use converge_types::{Hashpath, Message, Path, Value};

/// The zero hashpath a freshly-ingressed message starts from (spec.md §3
/// "Hashpath" describes the chain, not its genesis value; this is the
/// implementation's fixed starting point).
pub fn genesis_hashpath() -> Hashpath {
    Hashpath::from_bytes([0u8; 32])
}

/// The first path element, or `None` if the path is empty (spec.md §4.1
/// `head`: "returns the first element or the whole path-value when
/// atomic" — atomic values are already normalized to single-element paths
/// by [`Path::term_to_path`], so this reduces to "the first element").
pub fn head(path: &Path) -> Option<Value> {
    path.first().cloned()
}

/// The path remainder, or `None` meaning "terminal" (spec.md §4.1 `tail`;
/// spec.md §3 "Path": "a single-element terminal path signals resolution
/// completion").
pub fn tail(path: &Path) -> Option<Path> {
    if path.len() <= 1 {
        None
    } else {
        Some(path.rest())
    }
}

/// Extends `hashpath` by committing to `sub_input` (spec.md §4.1 `push`).
///
/// Non-message sub-inputs are wrapped in a single-field carrier before
/// committing so every sub-input — scalar or message — produces a
/// deterministic, distinct commitment.
pub fn push(hashpath: Hashpath, sub_input: &Value) -> Hashpath {
    match sub_input {
        Value::Message(m) => converge_crypto::blake3::push(hashpath, m),
        other => {
            let wrapper = Message::new().with("value", other.clone());
            converge_crypto::blake3::push(hashpath, &wrapper)
        }
    }
}

/// Renders a `/`-joined composite key as a [`Path`] (spec.md §4.1 "a
/// function rendering a composite key as a path").
pub fn key_to_path(key: &str) -> Path {
    Path::from_keys(key.split('/').filter(|segment| !segment.is_empty()))
}
