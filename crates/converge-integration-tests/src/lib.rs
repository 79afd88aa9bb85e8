//! Integration test crate for the Converge resolver.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise the resolver end to end across `converge-types`,
//! `converge-crypto`, `converge-store`, and `converge-resolver`.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p converge-integration-tests
//! ```
