//! Built-in devices shipped with the resolver.

pub mod message;
