//! The long-lived worker-promotion loop (spec.md §4.8 "Worker promotion
//! loop").
//!
//! When a group leader finishes, instead of simply clearing the dedup
//! entry it can hand the group off to a background task that keeps
//! re-running the same resolution on demand for a short idle window —
//! absorbing a burst of near-simultaneous repeat calls without each one
//! paying dispatch/group-join overhead from scratch. The task exits and
//! deregisters itself once no new join arrives within the idle timeout.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::error::Result;
use crate::group::{GroupKey, GroupOutcome, GroupRegistry};
use converge_types::Value;

/// The literal sub-input a worker resolves its held state against once its
/// idle timer fires (spec.md §4.8: "it resolves its held state against a
/// terminal `terminate` sub-input... then exits").
pub const TERMINATE: &str = "terminate";

/// A handle to a promoted worker's background task.
#[derive(Clone)]
pub struct WorkerHandle {
    outcomes: broadcast::Sender<GroupOutcome>,
    inbox: mpsc::Sender<Value>,
}

impl WorkerHandle {
    /// Subscribes to the worker's next broadcast outcome.
    pub fn subscribe(&self) -> broadcast::Receiver<GroupOutcome> {
        self.outcomes.subscribe()
    }

    /// Wakes the worker to resolve its held state against `sub_input` for a
    /// newly arrived joiner (spec.md §4.8: "Accepts
    /// `{resolve, listener, held, sub-input, _}` messages"). Best-effort: if
    /// the worker already exited (inbox closed, or its buffer is full
    /// because it is already mid-round), the caller will simply see its
    /// `subscribe`d receiver lag or close, which the caller already treats
    /// as a join timeout.
    pub fn notify(&self, sub_input: Value) {
        let _ = self.inbox.try_send(sub_input);
    }
}

/// Spawns a worker for `key`, resolving `held` against whatever sub-input
/// each `notify()` call carries, until `idle_timeout` elapses with no new
/// notification. On idle expiry it runs one final resolution against the
/// literal [`TERMINATE`] sub-input (letting devices flush in-memory state),
/// deregisters itself from `registry`, and exits (spec.md §4.8).
pub fn spawn<F>(
    key: GroupKey,
    registry: Arc<GroupRegistry>,
    idle_timeout: Duration,
    resolve: F,
) -> WorkerHandle
where
    F: Fn(Value) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value>> + Send>>
        + Send
        + Sync
        + 'static,
{
    let (outcomes, _) = broadcast::channel(8);
    let (inbox_tx, mut inbox_rx) = mpsc::channel(32);
    let handle = WorkerHandle {
        outcomes: outcomes.clone(),
        inbox: inbox_tx,
    };
    let weak_registry: Weak<GroupRegistry> = Arc::downgrade(&registry);

    tokio::spawn(async move {
        loop {
            match tokio::time::timeout(idle_timeout, inbox_rx.recv()).await {
                Ok(Some(sub_input)) => {
                    let outcome = match resolve(sub_input).await {
                        Ok(v) => GroupOutcome::Ok(v),
                        Err(e) => GroupOutcome::Err(e),
                    };
                    let _ = outcomes.send(outcome);
                }
                Ok(None) | Err(_) => {
                    let _ = resolve(Value::text(TERMINATE)).await;
                    if let Some(registry) = weak_registry.upgrade() {
                        registry.retire_worker(&key);
                    }
                    break;
                }
            }
        }
    });

    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn worker_reruns_resolve_on_each_notify() {
        let registry = Arc::new(GroupRegistry::new());
        let key = GroupKey::from_bytes(vec![1]);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let handle = spawn(
            key,
            registry,
            Duration::from_millis(200),
            move |_sub_input| {
                let calls = calls_clone.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Int(calls.load(Ordering::SeqCst) as i64))
                })
            },
        );

        let mut rx = handle.subscribe();
        handle.notify(Value::Bool(true));
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, GroupOutcome::Ok(Value::Int(1))));

        let mut rx2 = handle.subscribe();
        handle.notify(Value::Bool(true));
        let second = rx2.recv().await.unwrap();
        assert!(matches!(second, GroupOutcome::Ok(Value::Int(2))));
    }

    #[tokio::test]
    async fn worker_retires_registry_entry_after_idle_timeout() {
        let registry = Arc::new(GroupRegistry::new());
        let key = GroupKey::from_bytes(vec![2]);
        use crate::group::JoinOutcome;
        assert!(matches!(
            registry.join(key.clone(), &[], &Value::Bool(false)),
            JoinOutcome::Lead
        ));

        let handle = spawn(
            key.clone(),
            registry.clone(),
            Duration::from_millis(20),
            |_sub_input| Box::pin(async { Ok(Value::Bool(true)) }),
        );
        registry.finish_and_promote(key.clone(), GroupOutcome::Ok(Value::Bool(true)), handle);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(matches!(
            registry.join(key, &[], &Value::Bool(false)),
            JoinOutcome::Lead
        ));
    }
}
