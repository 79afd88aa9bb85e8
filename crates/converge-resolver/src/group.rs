//! In-flight deduplication: the group/leader plane (spec.md §4.6 "Group and
//! leader plane", §8 scenario 7 "deduplicated concurrent calls").
//!
//! Concurrent resolutions that hash to the same [`GroupKey`] share one
//! execution: the first caller becomes the leader and actually runs the
//! work; later callers become joiners, block on a one-shot broadcast, and
//! receive the leader's result. The registry lock is a plain
//! `std::sync::Mutex` and is never held across an `.await` — only used to
//! atomically read-or-insert an entry, mirroring the way the teacher's own
//! in-process registries are built.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use converge_types::Value;
use tokio::sync::broadcast;

use crate::error::{ResolverError, Result};
use crate::worker::WorkerHandle;

/// Identifies a dedup group: either the blake3 hash of the call's
/// canonical input+path bytes, or a device-supplied override (spec.md
/// §4.6 "group key derivation").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<u8>);

impl GroupKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// The outcome shared with joiners once the leader finishes (spec.md §4.6
/// "On completion the leader broadcasts its result").
#[derive(Debug, Clone)]
pub enum GroupOutcome {
    Ok(Value),
    Err(ResolverError),
}

enum GroupOwner {
    Leader {
        notify: broadcast::Sender<GroupOutcome>,
    },
    Worker(WorkerHandle),
}

/// What a caller should do after attempting to join a group (spec.md §4.6).
pub enum JoinOutcome {
    /// No one else is resolving this key; caller proceeds as leader and
    /// must call [`GroupRegistry::finish`] when done.
    Lead,
    /// Another caller is leading; wait on this receiver for its result.
    Wait(broadcast::Receiver<GroupOutcome>),
    /// Joining would rejoin an ancestor group in the same call chain
    /// (spec.md §5 "Reentrancy") — proceed without deduplication.
    Bypass,
}

/// The process-wide table of in-flight resolutions (spec.md §4.6).
#[derive(Default)]
pub struct GroupRegistry {
    entries: Mutex<HashMap<GroupKey, GroupOwner>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to join `key`'s group. Returns [`JoinOutcome::Bypass`]
    /// without touching the registry if `key` is one of the caller's own
    /// ancestor groups, preventing a handler's recursive `resolve` call
    /// from deadlocking against itself (spec.md §5 "Reentrancy").
    ///
    /// `sub_input` is only used when the group is already owned by a
    /// promoted worker: joining a worker's group immediately wakes it
    /// (spec.md §4.8 "Accepts `{resolve, listener, held, sub-input, _}`
    /// messages") since there is no separate leader to run the work.
    pub fn join(&self, key: GroupKey, ancestors: &[GroupKey], sub_input: &Value) -> JoinOutcome {
        if ancestors.contains(&key) {
            return JoinOutcome::Bypass;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&key) {
            Some(GroupOwner::Leader { notify }) => JoinOutcome::Wait(notify.subscribe()),
            Some(GroupOwner::Worker(handle)) => {
                handle.notify(sub_input.clone());
                JoinOutcome::Wait(handle.subscribe())
            }
            None => {
                let (notify, _) = broadcast::channel(1);
                entries.insert(key, GroupOwner::Leader { notify });
                JoinOutcome::Lead
            }
        }
    }

    /// Broadcasts `outcome` to every joiner and removes the group, without
    /// promoting a worker (spec.md §4.6 "On completion... removes the
    /// group entry").
    pub fn finish(&self, key: &GroupKey, outcome: GroupOutcome) {
        let owner = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.remove(key)
        };
        if let Some(GroupOwner::Leader { notify }) = owner {
            let _ = notify.send(outcome);
        }
    }

    /// Broadcasts `outcome` and, instead of clearing the group, installs
    /// `worker` as its new steward so a fresh call can still dedup against
    /// this key while the background worker loop keeps running (spec.md
    /// §4.8 "Worker promotion loop").
    pub fn finish_and_promote(&self, key: GroupKey, outcome: GroupOutcome, worker: WorkerHandle) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(GroupOwner::Leader { notify }) = entries.remove(&key) {
            let _ = notify.send(outcome);
        }
        entries.insert(key, GroupOwner::Worker(worker));
    }

    /// Drops a worker entry once its idle timeout fires (spec.md §4.8).
    pub fn retire_worker(&self, key: &GroupKey) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

/// Blocks a joiner until the leader broadcasts, or the wait exceeds
/// `timeout` (spec.md §5 "Cancellation and timeouts").
pub async fn await_outcome(
    mut receiver: broadcast::Receiver<GroupOutcome>,
    timeout: Duration,
) -> Result<Value> {
    match tokio::time::timeout(timeout, receiver.recv()).await {
        Ok(Ok(GroupOutcome::Ok(v))) => Ok(v),
        Ok(Ok(GroupOutcome::Err(e))) => Err(e),
        Ok(Err(_)) => Err(ResolverError::JoinTimedOut),
        Err(_) => Err(ResolverError::JoinTimedOut),
    }
}

pub fn group_key_for_call(input_hashpath_bytes: &[u8], path_bytes: &[u8]) -> GroupKey {
    let mut buf = Vec::with_capacity(input_hashpath_bytes.len() + path_bytes.len());
    buf.extend_from_slice(input_hashpath_bytes);
    buf.extend_from_slice(path_bytes);
    let digest = converge_crypto::blake3::derive_key(converge_crypto::blake3::contexts::GROUP_KEY, &buf);
    GroupKey::from_bytes(digest.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    #[test]
    fn first_joiner_leads_second_waits() {
        let registry = GroupRegistry::new();
        let key = GroupKey::from_bytes(vec![1, 2, 3]);
        assert!(matches!(registry.join(key.clone(), &[], &Value::Bool(false)), JoinOutcome::Lead));
        assert!(matches!(
            registry.join(key.clone(), &[], &Value::Bool(false)),
            JoinOutcome::Wait(_)
        ));
    }

    #[test]
    fn ancestor_group_bypasses_dedup() {
        let registry = GroupRegistry::new();
        let key = GroupKey::from_bytes(vec![9]);
        assert!(matches!(registry.join(key.clone(), &[], &Value::Bool(false)), JoinOutcome::Lead));
        assert!(matches!(
            registry.join(key.clone(), &[key.clone()], &Value::Bool(false)),
            JoinOutcome::Bypass
        ));
    }

    #[tokio::test]
    async fn joiner_receives_leader_outcome() {
        let registry = StdArc::new(GroupRegistry::new());
        let key = GroupKey::from_bytes(vec![4, 5, 6]);
        assert!(matches!(registry.join(key.clone(), &[], &Value::Bool(false)), JoinOutcome::Lead));
        let waiter = match registry.join(key.clone(), &[], &Value::Bool(false)) {
            JoinOutcome::Wait(rx) => rx,
            _ => unreachable!("second joiner always waits"),
        };
        registry.finish(&key, GroupOutcome::Ok(Value::Int(42)));
        let result = await_outcome(waiter, Duration::from_secs(1)).await.unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[tokio::test]
    async fn join_timeout_surfaces_as_error() {
        let registry = GroupRegistry::new();
        let key = GroupKey::from_bytes(vec![7]);
        assert!(matches!(registry.join(key.clone(), &[], &Value::Bool(false)), JoinOutcome::Lead));
        let waiter = match registry.join(key, &[], &Value::Bool(false)) {
            JoinOutcome::Wait(rx) => rx,
            _ => unreachable!(),
        };
        let err = await_outcome(waiter, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::JoinTimedOut));
    }
}
