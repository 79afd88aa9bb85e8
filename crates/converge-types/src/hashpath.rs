//! The cryptographic accumulator committing to every input along a
//! resolution chain (spec.md §3 "Hashpath").

use serde::{Deserialize, Serialize};

/// A 32-byte BLAKE3 hashpath value.
///
/// The commitment function itself (`H(hashpath(input) || commit(sub-input))`)
/// lives in `converge-crypto::blake3`, which depends on this crate; this type
/// is the plain data carrier so `converge-types` stays free of a crypto
/// dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hashpath([u8; 32]);

impl Hashpath {
    /// Wraps raw bytes as a hashpath.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Consumes `self`, returning the raw bytes.
    pub fn into_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Lowercase hex rendering, used for cache keys and log output.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Hashpath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let hp = Hashpath::from_bytes([1u8; 32]);
        assert_eq!(hp.to_hex().len(), 64);
        assert!(hp.to_hex().starts_with("0101"));
    }
}
