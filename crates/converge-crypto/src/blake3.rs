//! Domain-separated BLAKE3 hashing for the Converge resolver.
//!
//! BLAKE3 serves two purposes here, kept apart by domain separation via
//! BLAKE3's built-in mode flags so a value hashed for one purpose can never
//! collide with a value hashed for the other:
//!
//! - [`hash`] — plain content hashing: `commit`, the content-addressed
//!   store's blob ids.
//! - [`derive_key`] / [`keyed_hash`] — the hashpath accumulator (spec.md §3
//!   "Hashpath"): `hashpath(output) = H(hashpath(input) || commit(sub_input))`.
//!
//! ## Context strings
//!
//! Every keyed-hash domain used by this crate has a registered context
//! string below. Using an unregistered context string anywhere in this
//! crate is a bug, not a configuration choice.

use converge_types::{Hashpath, Message};

/// Registered BLAKE3 context strings.
pub mod contexts {
    /// Domain for the hashpath accumulator's inner keyed hash (spec.md §3).
    pub const HASHPATH_COMMIT: &str = "converge v1 hashpath-commit";

    /// Domain for deriving a dedup group key from a call's input hashpath
    /// and path (spec.md §4.6 "group key derivation").
    pub const GROUP_KEY: &str = "converge v1 group-key";

    /// All registered context strings, for validation.
    pub const ALL_CONTEXTS: &[&str] = &[HASHPATH_COMMIT, GROUP_KEY];
}

/// Compute the BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Compute a variable-length BLAKE3 hash.
pub fn hash_xof(data: &[u8], output: &mut [u8]) {
    let mut hasher = ::blake3::Hasher::new();
    hasher.update(data);
    let mut reader = hasher.finalize_xof();
    reader.fill(output);
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// `context` must be one of [`contexts::ALL_CONTEXTS`].
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    debug_assert!(
        is_registered_context(context),
        "unregistered BLAKE3 context string: {context}"
    );
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Compute a keyed BLAKE3 hash (MAC/PRF).
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, message).as_bytes()
}

/// `true` if `context` is a registered context string.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// The commit value for a sub-input: its content hash (spec.md §3
/// "Hashpath": `hashpath(output) = H(hashpath(input) || commit(sub_input))`).
///
/// Any message that hashes identically commits identically — this is the
/// one place cache-key collisions matter, and content hashing over the
/// canonical byte encoding is what `converge-store` keys its cache table on.
pub fn commit(sub_input: &Message) -> [u8; 32] {
    hash(&sub_input.canonical_bytes())
}

/// Extends a hashpath by committing to `sub_input` (spec.md §4.1 `push`,
/// §4.7 stage 6).
///
/// `converge-resolver::path::push` is the public entry point that also
/// handles the scalar-output bypass; this function is the pure
/// cryptographic step it delegates to.
pub fn push(hashpath: Hashpath, sub_input: &Message) -> Hashpath {
    let key = derive_key(contexts::HASHPATH_COMMIT, &[]);
    let sub_commit = commit(sub_input);
    let mut message = [0u8; 64];
    message[..32].copy_from_slice(hashpath.as_bytes());
    message[32..].copy_from_slice(&sub_commit);
    Hashpath::from_bytes(keyed_hash(&key, &message))
}

/// Encode multiple dynamic fields using length-prefixed encoding, matching
/// the convention `converge_types::Value::canonical_bytes` uses.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
