//! The 43-character content-addressed identifier (spec.md §3 "Device",
//! §4.2, §4.3): a URL-safe, unpadded base64 rendering of a 32-byte hash.
//!
//! 32 raw bytes base64url-encode to exactly 43 characters once the trailing
//! `=` padding is dropped, which is what makes the 43-byte length check in
//! [`crate::looks_like_content_id`] a reliable way to recognize a content id
//! among otherwise-arbitrary textual keys.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Renders a 32-byte hash as its 43-character content id.
pub fn encode(hash: &[u8; 32]) -> String {
    URL_SAFE_NO_PAD.encode(hash)
}

/// Parses a 43-character content id back into its 32-byte hash, if `id` is
/// well-formed base64url of the right length.
pub fn decode(id: &str) -> Option<[u8; 32]> {
    if !crate::looks_like_content_id(id) {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(id).ok()?;
    bytes.try_into().ok()
}
