//! The resolver state machine (spec.md §4.7, §4.10): the 9-stage pipeline
//! that drives every resolution, recursing along the path and optionally
//! promoting a persistent worker over the terminal state.

use std::sync::Arc;
use std::time::Duration;

use converge_store::{BlobStore, CacheStore};
use converge_types::{reserved, ErrorStrategy, Message, Options, Path, Value};

use crate::cache;
use crate::device::PreloadedDevices;
use crate::dispatch;
use crate::error::{FailureDetail, ResolverError, Result};
use crate::group::{self, GroupOutcome, GroupRegistry, JoinOutcome};
use crate::key::{self, SymbolTable};
use crate::options::ResolveOptions;
use crate::path;
use crate::worker;

/// The outcome of a top-level [`Resolver::resolve`] call (spec.md §6:
/// `resolve(...) → (ok, output) | (error, kind, detail)`).
#[derive(Debug, Clone)]
pub enum Resolution {
    Ok(Value),
    Error {
        whence: &'static str,
        detail: FailureDetail,
    },
}

impl Resolution {
    /// The successful value, or `None` on error — the `undefined` sentinel
    /// shape the shortcut surface (spec.md §4.9) collapses errors to.
    pub fn ok(self) -> Option<Value> {
        match self {
            Resolution::Ok(v) => Some(v),
            Resolution::Error { .. } => None,
        }
    }
}

/// Shared resolver state: the content-addressed cache and blob stores, the
/// in-flight deduplication registry, and the key-canonicalization symbol
/// table. Cheap to clone (every field is already behind an `Arc`);
/// constructed once per node and shared across every call.
pub struct Resolver {
    cache: Option<Arc<CacheStore>>,
    store: Option<Arc<BlobStore>>,
    groups: Arc<GroupRegistry>,
    symbols: Arc<SymbolTable>,
}

impl Resolver {
    pub fn new(cache: Option<Arc<CacheStore>>, store: Option<Arc<BlobStore>>) -> Self {
        Self {
            cache,
            store,
            groups: Arc::new(GroupRegistry::new()),
            symbols: Arc::new(SymbolTable::new()),
        }
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// The single entry point (spec.md §6 `resolve(input, sub-input,
    /// options)`). Applies `options.error_strategy` at this boundary only:
    /// internal recursion always propagates a bare [`ResolverError`].
    pub async fn resolve(
        self: &Arc<Self>,
        input: Message,
        sub_input: Value,
        options: ResolveOptions,
    ) -> Result<Resolution> {
        match self.resolve_step(input, sub_input, options.clone(), 0).await {
            Ok(value) => Ok(Resolution::Ok(value)),
            Err(error) => match options.options.error_strategy {
                ErrorStrategy::Throw => Err(error),
                ErrorStrategy::Return => Ok(Resolution::Error {
                    whence: error.whence(),
                    detail: error.detail(),
                }),
            },
        }
    }

    /// `resolve(msg, options)`, the single-argument form (spec.md §6):
    /// splits `msg.path` into the real input and the sub-input.
    pub async fn resolve_message(
        self: &Arc<Self>,
        msg: Message,
        options: ResolveOptions,
    ) -> Result<Resolution> {
        let sub_input = msg
            .path_field()
            .cloned()
            .unwrap_or_else(|| Value::List(vec![]));
        let input = msg.without(reserved::PATH);
        self.resolve(input, sub_input, options).await
    }

    async fn resolve_step(
        self: &Arc<Self>,
        input: Message,
        sub_input: Value,
        options: ResolveOptions,
        depth: u32,
    ) -> Result<Value> {
        if depth > options.options.max_resolution_depth {
            return Err(ResolverError::DepthExceeded);
        }

        // --- Stage 1: normalize --------------------------------------
        let sub_message = normalize_sub_input(&sub_input);
        let path = sub_message
            .path_field()
            .map(Path::term_to_path)
            .unwrap_or_default();

        let Some(head) = path::head(&path) else {
            return Ok(Value::Message(input));
        };

        if let Some(text) = head.as_text() {
            if converge_types::looks_like_content_id(text) {
                return self.resolve_reference_call(text, input, &path, options, depth).await;
            }
        }

        let key_text = key::to_key_string(&head).ok_or_else(|| {
            ResolverError::DeviceCall(FailureDetail::new(
                "normalize",
                "path head is not a textual key",
            ))
        })?;

        let input_hashpath = input.hashpath().unwrap_or_else(path::genesis_hashpath);
        let prospective_hashpath = path::push(input_hashpath, &head);

        // --- Stage 2: cache lookup ------------------------------------
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache::read(cache, prospective_hashpath).await? {
                if cached.hashpath() == Some(prospective_hashpath) {
                    return self
                        .continue_after_output(Value::Message(cached), &path, options, depth)
                        .await;
                }
            }
        }

        // --- Stage 3: device & handler resolution ----------------------
        let dispatched = dispatch::resolve_handler(
            input.device(),
            &options.preloaded_devices,
            self.store.as_deref(),
            &options.options,
            &key_text,
        )
        .await?;
        let call_options = options.with_add_key(dispatched.prepend_key);

        // --- Stage 4: group check --------------------------------------
        let group_key = match dispatched
            .device
            .info
            .as_ref()
            .and_then(|info| info.group.clone())
        {
            Some(group_handler) => {
                let args = [
                    Value::Message(input.clone()),
                    Value::Message(sub_message.clone()),
                    Value::Message(call_options.extra.clone()),
                ];
                let derived = group_handler
                    .call(&args)
                    .await
                    .map_err(ResolverError::DeviceCall)?;
                group::derive_custom_group_key(&derived)
            }
            None => group::group_key_for_call(input_hashpath.as_bytes(), &head.canonical_bytes()),
        };

        let join_outcome = self
            .groups
            .join(group_key.clone(), &call_options.groups, &sub_input);

        let leading = match join_outcome {
            JoinOutcome::Lead => true,
            JoinOutcome::Bypass => false,
            JoinOutcome::Wait(receiver) => {
                let value = match call_options.options.worker_timeout {
                    Some(timeout) => group::await_outcome(receiver, timeout).await?,
                    None => match receiver.recv().await {
                        Ok(GroupOutcome::Ok(v)) => v,
                        Ok(GroupOutcome::Err(e)) => return Err(e),
                        Err(_) => return Err(ResolverError::JoinTimedOut),
                    },
                };
                return self
                    .continue_after_output(value, &path, call_options, depth)
                    .await;
            }
        };

        let call_options = if leading {
            call_options.with_joined_group(group_key.clone())
        } else {
            call_options
        };

        // --- Stage 5: execute --------------------------------------------
        let mut args = Vec::with_capacity(4);
        if dispatched.prepend_key {
            args.push(head.clone());
        }
        args.push(Value::Message(input.clone()));
        args.push(Value::Message(sub_message.clone()));
        args.push(Value::Message(call_options.extra.clone()));

        let execution = dispatched.handler.call(&args).await;

        let outcome = match execution {
            Ok(output) => {
                // --- Stage 6: cryptographic link ---------------------------
                let linked = match (&output, call_options.options.hashpath) {
                    (Value::Message(m), converge_types::HashpathPolicy::Update) => {
                        Value::Message(m.with_hashpath(prospective_hashpath))
                    }
                    _ => output,
                };

                // --- Stage 7: cache write -----------------------------------
                if let (Some(cache), Value::Message(m)) = (&self.cache, &linked) {
                    if cache::should_cache(call_options.options.cache, &input, &sub_message) {
                        let path_label = key_text.clone();
                        if call_options.options.async_cache {
                            cache::write_async(
                                cache.clone(),
                                prospective_hashpath,
                                Some(path_label),
                                m.clone(),
                            );
                        } else {
                            cache::write_sync(cache, prospective_hashpath, Some(&path_label), m)
                                .await?;
                        }
                    }
                }

                Ok(linked)
            }
            Err(failure) => Err(ResolverError::DeviceCall(failure)),
        };

        // --- Stage 8: notify joiners ---------------------------------------
        if leading {
            let broadcast_outcome = match &outcome {
                Ok(v) => GroupOutcome::Ok(v.clone()),
                Err(e) => GroupOutcome::Err(e.clone()),
            };

            // --- Stage 9: recurse / fork / return ----------------------------
            if path::tail(&path).is_none() && call_options.options.spawn_worker && outcome.is_ok()
            {
                let held = outcome.as_ref().expect("checked ok above").clone();
                let resolver = self.clone();
                let held_message = held.as_message().cloned().unwrap_or_default();
                let worker_options = call_options.clone();
                let idle_timeout = call_options
                    .options
                    .worker_timeout
                    .unwrap_or(Duration::from_secs(u64::MAX / 2));
                let worker_group = group_key.clone();
                let groups_for_worker = self.groups.clone();
                let handle = worker::spawn(worker_group, groups_for_worker, idle_timeout, move |sub_input| {
                    let resolver = resolver.clone();
                    let held_message = held_message.clone();
                    let worker_options = worker_options.clone();
                    Box::pin(async move {
                        let terminal = sub_input
                            .as_text()
                            .map(|t| t == worker::TERMINATE)
                            .unwrap_or(false);
                        let call_opts = if terminal {
                            worker_options.with_hashpath_ignored()
                        } else {
                            worker_options.clone()
                        };
                        resolver
                            .resolve_step(held_message, sub_input, call_opts, 0)
                            .await
                    })
                });
                self.groups
                    .finish_and_promote(group_key, broadcast_outcome, handle);
            } else {
                self.groups.finish(&group_key, broadcast_outcome);
            }
        }

        let output = outcome?;
        self.continue_after_output(output, &path, call_options, depth)
            .await
    }

    /// Stage 9's recursion half: if the path has a tail, resolve it against
    /// `output` as the new input; otherwise this is the terminal result.
    async fn continue_after_output(
        self: &Arc<Self>,
        output: Value,
        path: &Path,
        options: ResolveOptions,
        depth: u32,
    ) -> Result<Value> {
        match path::tail(path) {
            Some(tail) => {
                let next_input = output.as_message().cloned().unwrap_or_default();
                self.resolve_step(next_input, tail.to_value(), options, depth + 1)
                    .await
            }
            None => Ok(output),
        }
    }

    /// Stage 1's reference-call expansion: the path's head is a 43-byte
    /// content id, so fetch the message it names from the store, resolve
    /// it against `input`, then continue with the path tail (spec.md §4.7
    /// stage 1).
    async fn resolve_reference_call(
        self: &Arc<Self>,
        content_id: &str,
        input: Message,
        path: &Path,
        options: ResolveOptions,
        depth: u32,
    ) -> Result<Value> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| ResolverError::Store("no content-addressed store configured".to_string()))?;
        let blob = store
            .read(content_id)
            .await?
            .ok_or_else(|| ResolverError::Store(format!("referenced message {content_id} not found")))?;
        let referenced: Message = serde_json::from_slice(&blob.bytes)
            .map_err(|e| ResolverError::Store(format!("malformed stored message: {e}")))?;

        let resolved = self
            .resolve_step(input, Value::Message(referenced), options.clone(), depth + 1)
            .await?;
        self.continue_after_output(resolved, path, options, depth)
            .await
    }
}

/// Stage 1's sub-input wrapping: a bare (non-message) sub-input becomes a
/// single-field message carrying it as `path`; an already message-shaped
/// sub-input (spec.md scenario 4's `{path: "k2", msg_key: "3"}`) is used as
/// given.
fn normalize_sub_input(sub_input: &Value) -> Message {
    match sub_input {
        Value::Message(m) => m.clone(),
        other => Message::new().with(reserved::PATH, other.clone()),
    }
}
