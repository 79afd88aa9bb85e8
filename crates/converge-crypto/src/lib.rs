//! # converge-crypto
//!
//! Cryptographic primitives used by the Converge resolver: the hashpath
//! accumulator and the device-loader signer-trust check. The resolver core
//! fixes its cryptographic suite rather than negotiating one.
//!
//! ## Modules
//!
//! - [`blake3`] — domain-separated BLAKE3 hashing: content commitments and
//!   the hashpath accumulator (spec.md §3 "Hashpath").
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032), used to
//!   verify a remote device blob's claimed signer (spec.md §4.3).

pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
