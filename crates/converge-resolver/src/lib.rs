//! # converge-resolver
//!
//! The Converge resolver: the nine-stage state machine that resolves a
//! message against another message through a device (spec.md §4.7),
//! composing into arbitrarily long paths, memoizing outputs in a
//! content-addressed cache (§4.5), deduplicating concurrent identical
//! executions (§4.6), cryptographically chaining each step into a
//! hashpath (§4.1, `converge-crypto::blake3`), and optionally promoting a
//! long-lived worker over a hot terminal state (§4.8).

pub mod cache;
pub mod device;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod key;
pub mod options;
pub mod path;
pub mod resolver;
pub mod shortcut;
pub mod worker;

pub use error::{DeviceFailure, FailureDetail, ResolverError, Result};
pub use options::ResolveOptions;
pub use resolver::{Resolution, Resolver};
