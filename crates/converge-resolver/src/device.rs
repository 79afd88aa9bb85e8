//! Devices, device info, and the device loader (spec.md §4.3 "Device
//! loader", §3 "Device", "Device info").
//!
//! `converge_types::Value` is plain, serializable data — it cannot carry a
//! closure the way an Erlang map can. So unlike the source system, an
//! "inline map of handlers" (spec.md §3 "Device" (i)) and a "symbolic
//! module identifier" (ii) share one Rust representation here, [`Device`]:
//! a key→handler table plus optional published [`DeviceInfo`]. What
//! differs is procedural, not structural — an inline device is handed
//! directly to a call (e.g. the `as` override in `converge-resolver::get`)
//! while a symbolic device is looked up by name from [`PreloadedDevices`].
//! A remote, content-addressed device (iii) resolves to the same `Device`
//! type once its blob's claimed content type names a runtime-recognized
//! symbol.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use converge_types::{Key, Options};

use crate::error::{DeviceFailure, ResolverError, Result};

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;
pub type HandlerResult = std::result::Result<converge_types::Value, DeviceFailure>;

pub type HandlerFn1 = Arc<dyn Fn(converge_types::Value) -> HandlerFuture + Send + Sync>;
pub type HandlerFn2 =
    Arc<dyn Fn(converge_types::Value, converge_types::Value) -> HandlerFuture + Send + Sync>;
pub type HandlerFn3 = Arc<
    dyn Fn(converge_types::Value, converge_types::Value, converge_types::Value) -> HandlerFuture
        + Send
        + Sync,
>;

/// A device-published callable, tagged with the arity it was declared at
/// (spec.md §4.4 rule 3: "Attempt arities 3, then 2, then 1").
///
/// A map-of-closures device can only register one handler per key, so
/// there is never ambiguity between arities for the same key — the
/// "attempt 3 then 2 then 1" search in spec.md models a BEAM module that
/// may export the same function name at multiple arities; here the
/// handler's own declared arity is simply the one used.
#[derive(Clone)]
pub enum Handler {
    One(HandlerFn1),
    Two(HandlerFn2),
    Three(HandlerFn3),
}

impl Handler {
    /// Invokes the handler with the dispatcher's ordered argument list,
    /// using only as many as the declared arity accepts — "arguments are
    /// always (input, sub-input, options)... any surplus beyond the
    /// handler's declared arity is dropped from the tail" (spec.md §4.4).
    pub async fn call(&self, args: &[converge_types::Value]) -> HandlerResult {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(converge_types::Value::Bool(false));
        match self {
            Handler::One(f) => f(arg(0)).await,
            Handler::Two(f) => f(arg(0), arg(1)).await,
            Handler::Three(f) => f(arg(0), arg(1), arg(2)).await,
        }
    }
}

/// The `handler` info field: a single catch-all callable, or a map with an
/// exclude list (spec.md §3 "Device info").
#[derive(Clone)]
pub enum CatchAllHandler {
    Func(Handler),
    WithExclude { func: Handler, exclude: Vec<Key> },
}

/// A device reference as it appears in a message's `device` field
/// (spec.md §3 "Device" (ii), (iii)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRef {
    /// A symbolic module identifier, looked up in `preloaded_devices`.
    Symbolic(String),
    /// A 43-character content-addressed id.
    ContentId(String),
}

impl DeviceRef {
    /// Parses a message's raw `device` field value (spec.md §4.3).
    pub fn parse(value: &converge_types::Value) -> Option<Self> {
        let text = value.as_text()?;
        if converge_types::looks_like_content_id(text) {
            Some(DeviceRef::ContentId(text.to_string()))
        } else {
            Some(DeviceRef::Symbolic(text.to_ascii_lowercase()))
        }
    }
}

/// Published device metadata (spec.md §3 "Device info").
#[derive(Clone, Default)]
pub struct DeviceInfo {
    /// Restricts which keys are callable at all (spec.md §4.4 rule 3).
    /// `None` means every handler key is exported.
    pub exports: Option<Vec<Key>>,
    pub handler: Option<CatchAllHandler>,
    pub default: Option<Handler>,
    pub default_mod: Option<DeviceRef>,
    /// Derives a custom deduplication group key (spec.md §4.6).
    pub group: Option<Handler>,
}

/// An executable device: a key→handler map plus optional published info
/// (spec.md §3 "Device").
#[derive(Default)]
pub struct Device {
    pub handlers: HashMap<Key, Handler>,
    pub info: Option<DeviceInfo>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_handler(mut self, key: impl Into<Key>, handler: Handler) -> Self {
        self.handlers.insert(key.into(), handler);
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// `true` if `key` is callable at all (spec.md §4.4 rule 3: "seek an
    /// exported handler").
    pub fn is_exported(&self, key: &str) -> bool {
        match self.info.as_ref().and_then(|i| i.exports.as_ref()) {
            Some(list) => list.iter().any(|k| k == key),
            None => true,
        }
    }
}

/// The process-wide table of preloaded (symbolic) devices (spec.md §6
/// `preloaded_devices`), plus the always-present default/identity device
/// (spec.md §4.4 rule 1).
pub struct PreloadedDevices {
    default_device: Arc<Device>,
    named: RwLock<HashMap<String, Arc<Device>>>,
}

impl PreloadedDevices {
    pub fn new() -> Self {
        Self {
            default_device: Arc::new(crate::devices::message::default_device()),
            named: RwLock::new(HashMap::new()),
        }
    }

    /// The identity/message device (spec.md §4.4 rule 1), always present.
    pub fn default_device(&self) -> Arc<Device> {
        self.default_device.clone()
    }

    /// Registers a symbolic device so `DeviceRef::Symbolic` lookups can
    /// find it.
    pub fn register(&self, name: impl Into<String>, device: Arc<Device>) {
        let mut named = self.named.write().unwrap_or_else(|e| e.into_inner());
        named.insert(name.into(), device);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Device>> {
        let named = self.named.read().unwrap_or_else(|e| e.into_inner());
        named.get(name).cloned()
    }
}

impl Default for PreloadedDevices {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves a device reference to an executable [`Device`] (spec.md §4.3
/// `load(ref, options)`).
pub async fn load(
    device_ref: &DeviceRef,
    preloaded: &PreloadedDevices,
    blobs: Option<&converge_store::BlobStore>,
    options: &Options,
) -> Result<Arc<Device>> {
    match device_ref {
        DeviceRef::Symbolic(name) => preloaded
            .get(name)
            .ok_or_else(|| ResolverError::ModuleNotAdmissable(name.clone())),
        DeviceRef::ContentId(id) => load_remote(id, preloaded, blobs, options).await,
    }
}

async fn load_remote(
    content_id: &str,
    preloaded: &PreloadedDevices,
    blobs: Option<&converge_store::BlobStore>,
    options: &Options,
) -> Result<Arc<Device>> {
    if !options.load_remote_devices {
        return Err(ResolverError::RemoteDevicesDisabled);
    }
    let store = blobs.ok_or_else(|| {
        ResolverError::DeviceNotLoadable("no content-addressed store configured".to_string())
    })?;
    let blob = store
        .read(content_id)
        .await?
        .ok_or_else(|| ResolverError::DeviceNotLoadable(format!("blob {content_id} not found")))?;

    if !options.trusted_device_signers.contains(&blob.signer_hex) {
        return Err(ResolverError::DeviceSignerNotTrusted(blob.signer_hex));
    }
    let verifying_key = converge_crypto::ed25519::VerifyingKey::from_hex(&blob.signer_hex)
        .map_err(|_| ResolverError::DeviceSignerNotTrusted(blob.signer_hex.clone()))?;
    let signature_bytes: [u8; 64] = blob
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| ResolverError::DeviceSignerNotTrusted("malformed signature".to_string()))?;
    let signature = converge_crypto::ed25519::Signature::from_bytes(&signature_bytes);
    verifying_key
        .verify(&blob.bytes, &signature)
        .map_err(|_| ResolverError::DeviceSignerNotTrusted(blob.signer_hex.clone()))?;

    // The blob's declared content type must name a device this runtime
    // actually knows how to run (spec.md §4.3: "must declare a
    // content-type compatible with the local runtime"). We have no code
    // loader, so the only admissible content type is the symbolic name of
    // an already-preloaded device — the remote blob is a trusted pointer,
    // not executable code.
    let device = preloaded.get(&blob.content_type).ok_or_else(|| {
        ResolverError::DeviceNotLoadable(format!(
            "content-type {} is not runnable on this node",
            blob.content_type
        ))
    })?;
    preloaded.register(content_id.to_string(), device.clone());
    Ok(device)
}
