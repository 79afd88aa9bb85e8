//! The ergonomic shortcut surface over the resolver (spec.md §4.9):
//! `get`, `set`, `remove`, `keys`, and the recursive deep `set`.
//!
//! Every function here is a thin composition of [`crate::resolver::Resolver::resolve`]
//! calls — none of them touch the resolver's internal stages directly.

use std::sync::Arc;

use converge_types::{reserved, Message, Value};

use crate::options::ResolveOptions;
use crate::path as path_algebra;
use crate::resolver::Resolver;

/// `keys(msg, opts, mode)`'s filtering mode (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeysMode {
    /// Every key the device enumerates.
    All,
    /// Reserved protocol keys (`device`, `path`, `hashpath`,
    /// `Cache-Control`) filtered out.
    ExcludingReserved,
}

/// `get(path, msg[, default[, opts]])` (spec.md §4.9): resolves `path`
/// against `msg` and returns the value on `ok`, `default` on `error`.
///
/// `path` is a `/`-joined composite key, e.g. `"a/b/c"`; a bare key such as
/// `"a"` is the common single-segment case.
pub async fn get(
    resolver: &Arc<Resolver>,
    path: &str,
    msg: Message,
    default: Option<Value>,
    opts: ResolveOptions,
) -> Option<Value> {
    let sub_input = path_algebra::key_to_path(path).to_value();
    match resolver.resolve(msg, sub_input, opts).await {
        Ok(resolution) => resolution.ok().or(default),
        Err(_) => default,
    }
}

/// The `{as, device, msg}` wrapper (spec.md §4.9): dispatches `get` through
/// `device_ref` without mutating `msg`'s own device binding in any returned
/// output's hashpath.
///
/// Implemented by overriding the `device` field on a throwaway clone of
/// `msg` for the duration of this one call; `msg`'s `hashpath` field is
/// untouched by the override (it is a separate field), so the resulting
/// output still chains from `msg`'s own hashpath rather than the
/// override's.
pub async fn get_as(
    resolver: &Arc<Resolver>,
    path: &str,
    device_ref: Value,
    msg: Message,
    default: Option<Value>,
    opts: ResolveOptions,
) -> Option<Value> {
    let overridden = msg.with(reserved::DEVICE, device_ref);
    get(resolver, path, overridden, default, opts).await
}

/// `set(msg, patch[, opts])` (spec.md §4.9): interprets `patch` as a
/// message and applies each of its non-reserved keys by invoking the
/// device's `set` handler, stripping `hashpath` from the patch before use.
pub async fn set(
    resolver: &Arc<Resolver>,
    msg: Message,
    patch: Message,
    opts: ResolveOptions,
) -> crate::error::Result<Message> {
    let stripped = patch.without_hashpath();
    let sub_input = Value::Message(stripped.with(reserved::PATH, Value::text("set")));
    let resolution = resolver.resolve(msg, sub_input, opts).await?;
    Ok(as_message(resolution))
}

fn as_message(resolution: crate::resolver::Resolution) -> Message {
    resolution
        .ok()
        .and_then(|v| v.as_message().cloned())
        .unwrap_or_default()
}

/// `set(msg, key, value[, opts])` (spec.md §4.9): treats `key` as a
/// `/`-joined path and performs a deep set — descend by `resolve(msg, k)`,
/// mutate the leaf via the device's `set`, then rebuild parents by calling
/// each parent device's `set` in turn so devices along the way can observe
/// their own child's new state (e.g. record a "modified" side-effect).
pub async fn set_deep(
    resolver: &Arc<Resolver>,
    msg: Message,
    key: &str,
    value: Value,
    opts: ResolveOptions,
) -> crate::error::Result<Message> {
    let path = path_algebra::key_to_path(key);
    let segments: Vec<String> = path
        .elements()
        .iter()
        .filter_map(|e| e.as_text().map(str::to_string))
        .collect();
    deep_set_segments(resolver, msg, &segments, value, opts).await
}

fn deep_set_segments<'a>(
    resolver: &'a Arc<Resolver>,
    msg: Message,
    segments: &'a [String],
    value: Value,
    opts: ResolveOptions,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::Result<Message>> + Send + 'a>>
{
    Box::pin(async move {
        let Some((head, rest)) = segments.split_first() else {
            return Ok(msg);
        };

        if rest.is_empty() {
            let patch = Message::new().with(head.clone(), value);
            return set(resolver, msg, patch, opts).await;
        }

        let child = get(resolver, head, msg.clone(), None, opts.clone())
            .await
            .and_then(|v| v.as_message().cloned())
            .unwrap_or_default();
        let new_child = deep_set_segments(resolver, child, rest, value, opts.clone()).await?;
        let patch = Message::new().with(head.clone(), Value::Message(new_child));
        set(resolver, msg, patch, opts).await
    })
}

/// `remove(msg, key[, opts])` (spec.md §4.9): delegates to the device's
/// `remove` handler.
pub async fn remove(
    resolver: &Arc<Resolver>,
    msg: Message,
    key: &str,
    opts: ResolveOptions,
) -> crate::error::Result<Message> {
    let sub_input = Value::Message(
        Message::new()
            .with(reserved::PATH, Value::text("remove"))
            .with("key", Value::text(key)),
    );
    let resolution = resolver.resolve(msg, sub_input, opts).await?;
    Ok(as_message(resolution))
}

/// `keys(msg[, opts[, mode]])` (spec.md §4.9): the device's key
/// enumeration, with `KeysMode::ExcludingReserved` filtering the
/// well-known reserved keys out.
pub async fn keys(
    resolver: &Arc<Resolver>,
    msg: Message,
    opts: ResolveOptions,
    mode: KeysMode,
) -> crate::error::Result<Vec<String>> {
    let resolution = resolver
        .resolve(msg, Value::text("keys"), opts)
        .await?;
    let all: Vec<String> = resolution
        .ok()
        .and_then(|v| v.as_list().map(|items| items.to_vec()))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_text().map(str::to_string))
        .collect();
    Ok(match mode {
        KeysMode::All => all,
        KeysMode::ExcludingReserved => all
            .into_iter()
            .filter(|k| !reserved::ALL.contains(&k.as_str()))
            .collect(),
    })
}
