//! The options bag threaded through resolution (spec.md §6 "Options keys
//! recognized").
//!
//! Only the plain-data, configuration-shaped fields live here — the fields
//! that carry live resolver state (`groups`, `preloaded_devices`) wrap this
//! type in `converge-resolver::options::ResolveOptions` instead, since
//! `converge-types` must not depend on closures or registries.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Value;

/// Whether a resolution step should extend the hashpath (spec.md §3, §4.7
/// stage 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashpathPolicy {
    /// Append `push(hashpath, output, sub_input)` when the output is a
    /// message.
    Update,
    /// Leave the hashpath untouched. Forced for the worker loop's final
    /// `terminate` resolution (spec.md §4.8).
    Ignore,
}

impl Default for HashpathPolicy {
    fn default() -> Self {
        HashpathPolicy::Update
    }
}

/// Whether a stage-5/stage-3 failure is raised to the caller or returned as
/// a structured value (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    /// Re-raise with the original cause.
    Throw,
    /// Return `(error, whence, (class, reason, stack))`.
    Return,
}

impl Default for ErrorStrategy {
    fn default() -> Self {
        ErrorStrategy::Return
    }
}

/// `prefer` option scope (spec.md §6): whether option lookup favors the
/// per-call local override or the node-wide global default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prefer {
    Local,
    Global,
}

impl Default for Prefer {
    fn default() -> Self {
        Prefer::Local
    }
}

/// The global `cache` option token (spec.md §4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Force caching regardless of per-message `Cache-Control`.
    Always,
    /// Cache subject to per-message `Cache-Control` negotiation (default).
    Normal,
    /// Never read from cache and never write to it.
    NoCache,
    /// Never write to cache (reads still allowed).
    NoStore,
    /// Caching fully disabled, same effect as `no_store` at the global
    /// level; kept distinct because some callers mean "no opinion" with
    /// `Normal` and "explicitly off" with `None`.
    None,
}

impl Default for CacheMode {
    fn default() -> Self {
        CacheMode::Normal
    }
}

impl CacheMode {
    /// `true` if this global option alone rules out caching the result
    /// (spec.md §4.5 write condition (i)).
    pub fn disables_caching(self) -> bool {
        matches!(self, CacheMode::NoCache | CacheMode::NoStore | CacheMode::None)
    }

    /// `true` if this global option forces caching regardless of
    /// per-message `Cache-Control` (still subject to a failed execution
    /// never being cached, per spec.md §4.7 stage 5).
    pub fn forces_caching(self) -> bool {
        matches!(self, CacheMode::Always)
    }
}

/// A parsed per-message `Cache-Control` value (spec.md §4.5 write condition
/// (ii)): a set of tokens, the way an HTTP `Cache-Control` header is a set
/// of directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheControlHeader(BTreeSet<String>);

impl CacheControlHeader {
    /// The tokens this source disables caching on.
    const DISABLING_TOKENS: [&'static str; 3] = ["no_cache", "no_store", "no_transform"];

    /// Parses a `Cache-Control`-shaped [`Value`]: a comma-joined byte
    /// string, a symbol, or a list of scalars, matching the flexibility
    /// the rest of the message model allows for scalar fields.
    pub fn from_value(value: &Value) -> Self {
        let tokens: BTreeSet<String> = match value {
            Value::List(items) => items
                .iter()
                .filter_map(|v| v.as_text())
                .map(|s| s.trim().to_ascii_lowercase())
                .collect(),
            other => other
                .as_text()
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        };
        Self(tokens)
    }

    /// `true` if this source carries any of the three caching-disabling
    /// directives.
    pub fn disables_caching(&self) -> bool {
        Self::DISABLING_TOKENS.iter().any(|t| self.0.contains(*t))
    }
}

/// The configuration-shaped subset of spec.md §6's options bag.
///
/// Defaults mirror a conservative, safe-by-default node: caching on but
/// negotiated, workers disabled unless requested, remote (content-
/// addressed) devices disabled unless explicitly enabled with a non-empty
/// trust list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub hashpath: HashpathPolicy,
    pub cache: CacheMode,
    pub async_cache: bool,
    pub spawn_worker: bool,
    /// `None` means infinite (spec.md §5 "Cancellation and timeouts").
    pub worker_timeout: Option<Duration>,
    pub error_strategy: ErrorStrategy,
    pub load_remote_devices: bool,
    /// Hex-encoded Ed25519 verifying keys trusted to sign remote device
    /// blobs (spec.md §4.3).
    pub trusted_device_signers: BTreeSet<String>,
    pub prefer: Prefer,
    /// Internal: whether the chosen dispatch path should prepend `key` to
    /// the handler's arguments (spec.md §4.4 rule 4, §4.7 stage 3).
    pub add_key: bool,
    /// Maximum combined reference-call-expansion and path-tail recursion
    /// depth (SPEC_FULL.md supplement; spec.md §9 flags the need for a cap
    /// without specifying one).
    pub max_resolution_depth: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hashpath: HashpathPolicy::default(),
            cache: CacheMode::default(),
            async_cache: false,
            spawn_worker: false,
            worker_timeout: Some(Duration::from_secs(30)),
            error_strategy: ErrorStrategy::default(),
            load_remote_devices: false,
            trusted_device_signers: BTreeSet::new(),
            prefer: Prefer::default(),
            add_key: false,
            max_resolution_depth: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_mode_disabling() {
        assert!(CacheMode::NoCache.disables_caching());
        assert!(CacheMode::NoStore.disables_caching());
        assert!(CacheMode::None.disables_caching());
        assert!(!CacheMode::Normal.disables_caching());
        assert!(!CacheMode::Always.disables_caching());
    }

    #[test]
    fn cache_control_header_parses_comma_list() {
        let header = CacheControlHeader::from_value(&Value::text("no_cache, max-age=60"));
        assert!(header.disables_caching());
    }

    #[test]
    fn cache_control_header_allows_unrelated_tokens() {
        let header = CacheControlHeader::from_value(&Value::text("max-age=60"));
        assert!(!header.disables_caching());
    }

    #[test]
    fn options_defaults_are_conservative() {
        let opts = Options::default();
        assert!(!opts.load_remote_devices);
        assert!(opts.trusted_device_signers.is_empty());
        assert!(!opts.spawn_worker);
    }
}
