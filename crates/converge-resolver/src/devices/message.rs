//! The default/identity device (spec.md §4.4 rule 1: "the identity/message
//! device that returns keys as they appear in the message mapping and
//! implements `set`, `remove`, `keys`").
//!
//! Every input that does not declare its own `device` field resolves
//! against this device. Its explicit `set`/`remove`/`keys` handlers are
//! found by dispatch rule 3 (exported handler named after the key); any
//! other key falls through to rule 4's `default` callable, which looks the
//! key up directly in the input message.

use std::sync::Arc;

use converge_types::{reserved, Message, Value};

use crate::device::{Device, DeviceInfo, Handler, HandlerFn1, HandlerFn2};
use crate::error::DeviceFailure;
use crate::key;

fn get_by_key() -> HandlerFn2 {
    Arc::new(|key_value, input| {
        Box::pin(async move {
            let key_text = key::to_key_string(&key_value)
                .ok_or_else(|| DeviceFailure::new("dispatch", "non-textual key"))?;
            let message = input.as_message().cloned().unwrap_or_default();
            message
                .get(&key_text)
                .cloned()
                .ok_or_else(|| DeviceFailure::new("not_found", format!("key {key_text} not set")))
        })
    })
}

/// `set(input, patch)`: merges every non-reserved field of `patch` into
/// `input`, leaving `device`/`path`/`hashpath`/`Cache-Control` on either
/// side untouched (spec.md §4.9 `set(msg, patch)`).
fn set_handler() -> HandlerFn2 {
    Arc::new(|input, patch| {
        Box::pin(async move {
            let base = input.as_message().cloned().unwrap_or_default();
            let patch = patch.as_message().cloned().unwrap_or_default();
            let mut merged = base;
            for (k, v) in patch.iter() {
                if reserved::ALL.contains(&k.as_str()) {
                    continue;
                }
                merged = merged.with(k.clone(), v.clone());
            }
            Ok(Value::Message(merged))
        })
    })
}

/// `remove(input, {key: K})`: returns `input` without `K` (spec.md §4.9
/// `remove(msg, key)`). The key to drop travels as a `key` field on the
/// sub-input message rather than as the bare sub-input value, since the
/// sub-input message is also what carries the `path: "remove"` selector
/// dispatch routes on.
fn remove_handler() -> HandlerFn2 {
    Arc::new(|input, sub_input| {
        Box::pin(async move {
            let base = input.as_message().cloned().unwrap_or_default();
            let key_text = sub_input
                .as_message()
                .and_then(|m| m.get("key"))
                .and_then(key::to_key_string);
            Ok(Value::Message(match key_text {
                Some(k) => base.without(&k),
                None => base,
            }))
        })
    })
}

/// `keys(input)`: every key in `input`'s mapping, in canonical order
/// (spec.md §4.9 `keys(msg, opts, mode)`). The reserved-key filter for
/// `remove` mode is applied by the shortcut surface on top of this raw
/// enumeration, matching spec.md's own phrasing ("returns the device's key
/// enumeration; `remove` mode filters...").
fn keys_handler() -> HandlerFn1 {
    Arc::new(|input| {
        Box::pin(async move {
            let message = input.as_message().cloned().unwrap_or_default();
            Ok(Value::List(
                message.keys().map(|k| Value::text(k.clone())).collect(),
            ))
        })
    })
}

/// Builds the always-present default/identity device (spec.md §4.4 rule 1).
pub fn default_device() -> Device {
    Device::new()
        .with_handler("set", Handler::Two(set_handler()))
        .with_handler("remove", Handler::Two(remove_handler()))
        .with_handler("keys", Handler::One(keys_handler()))
        .with_info(DeviceInfo {
            exports: None,
            handler: None,
            default: Some(Handler::Two(get_by_key())),
            default_mod: None,
            group: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Handler;
    use converge_types::Value;

    async fn call_two(handler: &Handler, a: Value, b: Value) -> Value {
        handler.call(&[a, b]).await.expect("handler succeeds")
    }

    #[tokio::test]
    async fn default_callable_looks_up_key_in_input() {
        let device = default_device();
        let default_handler = device.info.as_ref().unwrap().default.clone().unwrap();
        let input = Value::Message(Message::new().with("a", Value::Int(1)));
        let result = call_two(&default_handler, Value::text("a"), input).await;
        assert_eq!(result, Value::Int(1));
    }

    #[tokio::test]
    async fn set_merges_non_reserved_fields() {
        let device = default_device();
        let set = device.handlers.get("set").unwrap();
        let input = Value::Message(Message::new().with("a", Value::Int(1)));
        let patch = Value::Message(
            Message::new()
                .with("b", Value::Int(2))
                .with(reserved::DEVICE, Value::text("ignored@1.0")),
        );
        let result = call_two(set, input, patch).await;
        let message = result.as_message().unwrap();
        assert_eq!(message.get("a"), Some(&Value::Int(1)));
        assert_eq!(message.get("b"), Some(&Value::Int(2)));
        assert!(!message.has_device());
    }

    #[tokio::test]
    async fn remove_drops_named_key() {
        let device = default_device();
        let remove = device.handlers.get("remove").unwrap();
        let input = Value::Message(Message::new().with("a", Value::Int(1)).with("b", Value::Int(2)));
        let sub_input = Value::Message(Message::new().with("key", Value::text("a")));
        let result = call_two(remove, input, sub_input).await;
        let message = result.as_message().unwrap();
        assert!(message.get("a").is_none());
        assert_eq!(message.get("b"), Some(&Value::Int(2)));
    }

    #[tokio::test]
    async fn keys_lists_every_field() {
        let device = default_device();
        let keys = device.handlers.get("keys").unwrap();
        let input = Value::Message(Message::new().with("a", Value::Int(1)).with("b", Value::Int(2)));
        let result = keys.call(&[input]).await.expect("ok");
        let items = result.as_list().unwrap();
        assert_eq!(items.len(), 2);
    }
}
