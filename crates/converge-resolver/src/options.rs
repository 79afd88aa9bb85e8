//! The live options value threaded through a resolution (spec.md §6
//! "Options keys recognized").
//!
//! `converge_types::Options` carries the plain-data, serializable fields;
//! this wraps it with the live, in-process state that can't cross a wire
//! or a config file — the preloaded-device registry and the ancestor-group
//! stack (spec.md §5 "Reentrancy").

use std::sync::Arc;

use converge_types::{Message, Options};

use crate::device::PreloadedDevices;
use crate::group::GroupKey;

/// The options value passed between resolver stages.
///
/// Cloning is cheap: the registry is behind an `Arc` and `groups`/`extra`
/// are typically small.
#[derive(Clone)]
pub struct ResolveOptions {
    pub options: Options,
    /// Ancestor group keys currently joined by this call chain (spec.md §5
    /// "Reentrancy"): lets a handler's recursive `resolve` call detect it
    /// would rejoin its own parent's group and pick a different one via the
    /// device's `group` hook, or bypass joining.
    pub groups: Vec<GroupKey>,
    /// The process-wide table of preloaded (symbolic) devices (spec.md §6
    /// `preloaded_devices`).
    pub preloaded_devices: Arc<PreloadedDevices>,
    /// Arbitrary additional fields devices or callers may stash on the
    /// options bag. Spec.md §6 lists the options keys it recognizes but
    /// does not close the bag to extension (scenario 8.4's custom
    /// `opts_key` is exactly this).
    pub extra: Message,
}

impl ResolveOptions {
    pub fn new(options: Options, preloaded_devices: Arc<PreloadedDevices>) -> Self {
        Self {
            options,
            groups: Vec::new(),
            preloaded_devices,
            extra: Message::new(),
        }
    }

    /// Returns a copy with `key` bumped as the current call's dispatch-time
    /// `add_key` flag (spec.md §4.4 rule 4, §4.7 stage 3).
    #[must_use]
    pub fn with_add_key(&self, add_key: bool) -> Self {
        let mut next = self.clone();
        next.options.add_key = add_key;
        next
    }

    /// Returns a copy with `group` pushed onto the ancestor stack.
    #[must_use]
    pub fn with_joined_group(&self, group: GroupKey) -> Self {
        let mut next = self.clone();
        next.groups.push(group);
        next
    }

    /// Returns a copy with `hashpath` forced to `ignore` (spec.md §4.8: the
    /// worker loop's final `terminate` resolution runs with the hashpath
    /// policy forced to `ignore`).
    #[must_use]
    pub fn with_hashpath_ignored(&self) -> Self {
        let mut next = self.clone();
        next.options.hashpath = converge_types::HashpathPolicy::Ignore;
        next
    }

    /// `true` if `group` is an ancestor of the current call (spec.md §5
    /// "Reentrancy").
    pub fn is_ancestor_group(&self, group: &GroupKey) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
