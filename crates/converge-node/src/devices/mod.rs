//! Devices shipped with the node binary, on top of the resolver's own
//! built-in default/identity device.

pub mod echo;
