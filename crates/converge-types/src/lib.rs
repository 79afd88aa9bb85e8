//! # converge-types
//!
//! Shared data model for the Converge resolver: messages, values, keys,
//! paths, hashpaths, and the options bag threaded through every resolution.
//! Pure data — no resolution logic lives here (see `converge-resolver`).

pub mod content_id;
pub mod hashpath;
pub mod message;
pub mod options;
pub mod path;
pub mod value;

pub use hashpath::Hashpath;
pub use message::Message;
pub use options::{CacheControlHeader, CacheMode, ErrorStrategy, HashpathPolicy, Options, Prefer};
pub use path::{Path, PathElement};
pub use value::Value;

/// A canonicalized message key: a lowercased, case-insensitive string.
///
/// `spec.md` §3 calls keys "canonicalized strings (case-insensitive; may be
/// rendered as symbols when they match a known symbol)". The symbol-vs-string
/// rendering distinction is a display/normalization concern of
/// `converge-resolver::key`; the storage representation is always this
/// canonical lowercase string.
pub type Key = String;

/// Reserved message keys with protocol-level meaning (spec.md §6).
pub mod reserved {
    /// Selects the handler module for a message.
    pub const DEVICE: &str = "device";
    /// Carries the residual hierarchical selector for the current resolution.
    pub const PATH: &str = "path";
    /// The cryptographic witness chain (spec.md §3 "Hashpath").
    pub const HASHPATH: &str = "hashpath";
    /// Per-message cache-control override (spec.md §4.5).
    pub const CACHE_CONTROL: &str = "Cache-Control";

    /// All reserved keys, used by `keys(msg, opts, "remove")` filtering
    /// (spec.md §4.9).
    pub const ALL: &[&str] = &[DEVICE, PATH, HASHPATH, CACHE_CONTROL];
}

/// Length in bytes of a content-addressed identifier (spec.md §3 "Device").
pub const CONTENT_ID_LEN: usize = 43;

/// Returns `true` when `s` has the shape of a 43-character content-addressed
/// id (spec.md §4.3, §4.2): exactly [`CONTENT_ID_LEN`] bytes.
pub fn looks_like_content_id(s: &str) -> bool {
    s.len() == CONTENT_ID_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_length_check() {
        assert!(looks_like_content_id(&"a".repeat(CONTENT_ID_LEN)));
        assert!(!looks_like_content_id("too-short"));
    }

    #[test]
    fn reserved_keys_list_matches_constants() {
        assert_eq!(
            reserved::ALL,
            &[
                reserved::DEVICE,
                reserved::PATH,
                reserved::HASHPATH,
                reserved::CACHE_CONTROL
            ]
        );
    }
}
