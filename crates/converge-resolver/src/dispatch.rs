//! Dispatch planner (spec.md §4.4): given `(input, key, options)`, decides
//! which concrete handler runs and whether `key` is prepended to its
//! argument list.

use std::sync::Arc;

use converge_types::Options;

use crate::device::{self, CatchAllHandler, Device, DeviceRef, Handler, PreloadedDevices};
use crate::error::{ResolverError, Result};

/// A dispatch decision: the device the handler came from (needed by stage 4
/// for its `group` hook), the handler to invoke, and whether `key` must be
/// prepended to the call's argument list (spec.md §4.4 rule 4: "a `default`
/// callable additionally receives the key as a prepended argument").
pub struct Dispatch {
    pub device: Arc<Device>,
    pub handler: Handler,
    pub prepend_key: bool,
}

/// Resolves `key` against `input`'s declared device (or the default device
/// if none is declared), applying the five-rule ordered search of
/// spec.md §4.4.
///
/// Implemented as a loop rather than recursion: rule 2's `exclude` list and
/// rule 4's `default_mod` both redirect dispatch to a different device and
/// re-run the same search, which a loop expresses without the ceremony of
/// boxed recursive futures.
pub async fn resolve_handler(
    device_ref: Option<&converge_types::Value>,
    preloaded: &PreloadedDevices,
    blobs: Option<&converge_store::BlobStore>,
    options: &Options,
    key: &str,
) -> Result<Dispatch> {
    let mut device = match device_ref {
        Some(value) => {
            let parsed = DeviceRef::parse(value).ok_or_else(|| {
                ResolverError::DeviceNotLoadable("device field is not a valid reference".to_string())
            })?;
            device::load(&parsed, preloaded, blobs, options).await?
        }
        None => preloaded.default_device(),
    };
    // Rule 1 already chose the device above (default when undeclared); this
    // flag tracks whether we are *on* the default device for rule 5's
    // terminal-failure check, which only fires once we can no longer fall
    // back any further.
    let mut on_default_device = device_ref.is_none();

    for _ in 0..16 {
        let info = device.info.clone();

        // Rule 2: a published catch-all handler.
        if let Some(handler) = info.as_ref().and_then(|i| i.handler.as_ref()) {
            match handler {
                CatchAllHandler::Func(h) => {
                    return Ok(Dispatch {
                        device,
                        handler: h.clone(),
                        prepend_key: false,
                    });
                }
                CatchAllHandler::WithExclude { func, exclude } => {
                    if exclude.iter().any(|excluded| excluded == key) {
                        device = preloaded.default_device();
                        on_default_device = true;
                        continue;
                    }
                    return Ok(Dispatch {
                        device,
                        handler: func.clone(),
                        prepend_key: false,
                    });
                }
            }
        }

        // Rule 3: an exported handler named `key`, at whatever arity it was
        // registered at (spec.md: "Attempt arities 3, then 2, then 1" — a
        // closure-based device can only register one arity per key, so the
        // registered arity is simply the one used).
        if device.is_exported(key) {
            if let Some(handler) = device.handlers.get(key) {
                return Ok(Dispatch {
                    device,
                    handler: handler.clone(),
                    prepend_key: false,
                });
            }
        }

        // Rule 4: `default` / `default_mod` fallback.
        if let Some(info) = info.as_ref() {
            if let Some(default_handler) = &info.default {
                return Ok(Dispatch {
                    device,
                    handler: default_handler.clone(),
                    prepend_key: true,
                });
            }
            if let Some(default_mod) = &info.default_mod {
                device = device::load(default_mod, preloaded, blobs, options).await?;
                continue;
            }
        }

        // Rule 5: fall back to the default device; fail if we are already
        // there.
        if on_default_device {
            return Err(ResolverError::DefaultDeviceCouldNotResolveKey(key.to_string()));
        }
        device = preloaded.default_device();
        on_default_device = true;
    }

    Err(ResolverError::DeviceNotLoadable(
        "default_mod chain exceeded 16 hops".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceInfo, HandlerFn1};
    use converge_types::Value;

    fn noop_handler() -> HandlerFn1 {
        Arc::new(|input| Box::pin(async move { Ok(input) }))
    }

    #[tokio::test]
    async fn undeclared_device_uses_default() {
        let preloaded = PreloadedDevices::new();
        let dispatch = resolve_handler(None, &preloaded, None, &Options::default(), "a")
            .await
            .expect("dispatches");
        assert!(dispatch.prepend_key);
    }

    #[tokio::test]
    async fn exported_handler_wins_over_default() {
        let preloaded = PreloadedDevices::new();
        let device = Arc::new(Device::new().with_handler("greet", Handler::One(noop_handler())));
        preloaded.register("greeter@1.0", device);
        let dispatch = resolve_handler(
            Some(&Value::text("greeter@1.0")),
            &preloaded,
            None,
            &Options::default(),
            "greet",
        )
        .await
        .expect("dispatches");
        assert!(!dispatch.prepend_key);
    }

    #[tokio::test]
    async fn exclude_reverts_to_default_device() {
        let preloaded = PreloadedDevices::new();
        let device = Arc::new(Device::new().with_info(DeviceInfo {
            handler: Some(CatchAllHandler::WithExclude {
                func: Handler::One(noop_handler()),
                exclude: vec!["set".to_string()],
            }),
            ..Default::default()
        }));
        preloaded.register("catchall@1.0", device);
        let dispatch = resolve_handler(
            Some(&Value::text("catchall@1.0")),
            &preloaded,
            None,
            &Options::default(),
            "set",
        )
        .await
        .expect("dispatches");
        // The default device's `set` is exported, arity two.
        assert!(!dispatch.prepend_key);
    }

    #[tokio::test]
    async fn unresolvable_key_on_default_device_is_fatal() {
        let preloaded = PreloadedDevices::new();
        let device = Arc::new(Device::new());
        preloaded.register("empty@1.0", device);
        let err = resolve_handler(
            Some(&Value::text("empty@1.0")),
            &preloaded,
            None,
            &Options::default(),
            "nonexistent",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ResolverError::DefaultDeviceCouldNotResolveKey(_)
        ));
    }
}
