//! Error kinds and propagation policy (spec.md §7 "Error handling design").

use converge_types::Value;

/// The structured `(class, reason, stack)` shape spec.md §7 returns when
/// `error_strategy == return`.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureDetail {
    pub class: String,
    pub reason: String,
    pub stack: Option<String>,
}

impl FailureDetail {
    pub fn new(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            reason: reason.into(),
            stack: None,
        }
    }
}

/// A failure returned (not thrown) by a device handler, or synthesized by
/// the resolver itself (spec.md §4.7 stage 5: "any other shape... skips
/// stages 6 and jumps to stage 7"). Device authors construct this directly
/// when their handler wants to fail without the overhead of the `?`-based
/// `ResolverError` path — it is the Rust analog of a BEAM process
/// returning an error tuple instead of throwing.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFailure {
    pub detail: FailureDetail,
    /// The raw value the handler returned, if the caller wants it verbatim
    /// (e.g. a device that returns `{error, custom_reason}`).
    pub payload: Option<Value>,
}

impl DeviceFailure {
    pub fn new(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            detail: FailureDetail::new(class, reason),
            payload: None,
        }
    }
}

/// The resolver's error kinds (spec.md §7 "Kinds").
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ResolverError {
    /// Device reference valid in form but unusable: missing, unsigned,
    /// untrusted, or incompatible (spec.md §4.3).
    #[error("device not loadable: {0}")]
    DeviceNotLoadable(String),

    /// A handler raised (returned a non-ok shape) during execution
    /// (spec.md §4.7 stage 5).
    #[error("device call failed: {}", .0.reason)]
    DeviceCall(FailureDetail),

    /// Dispatch exhausted every rule including the default device
    /// (spec.md §4.4 rule 5) — a misconfiguration, not a user error.
    #[error("default device could not resolve key: {0}")]
    DefaultDeviceCouldNotResolveKey(String),

    /// `load_remote_devices` is off (spec.md §4.3).
    #[error("remote devices disabled")]
    RemoteDevicesDisabled,

    /// The blob's claimed signer is not in `trusted_device_signers`, or its
    /// signature does not verify (spec.md §4.3; SPEC_FULL.md decides the
    /// latter collapses into this same kind).
    #[error("device signer not trusted: {0}")]
    DeviceSignerNotTrusted(String),

    /// A symbolic device alias has no entry in `preloaded_devices`
    /// (spec.md §4.3).
    #[error("module not admissable: {0}")]
    ModuleNotAdmissable(String),

    /// Combined reference-call-expansion / path-tail recursion depth
    /// exceeded `max_resolution_depth` (SPEC_FULL.md supplement).
    #[error("maximum resolution depth exceeded")]
    DepthExceeded,

    /// The underlying cache or blob store failed (escalated per spec.md §7
    /// "Failures in stage 7... are non-fatal when async; otherwise they
    /// escalate per the chosen strategy").
    #[error("store error: {0}")]
    Store(String),

    /// A joiner's receive timed out waiting for the group leader
    /// (spec.md §5 "Cancellation and timeouts").
    #[error("join wait timed out")]
    JoinTimedOut,
}

impl From<converge_store::DbError> for ResolverError {
    fn from(e: converge_store::DbError) -> Self {
        ResolverError::Store(e.to_string())
    }
}

impl From<converge_crypto::CryptoError> for ResolverError {
    fn from(e: converge_crypto::CryptoError) -> Self {
        ResolverError::DeviceSignerNotTrusted(e.to_string())
    }
}

impl ResolverError {
    /// The `whence` stage name used in the `(error, whence, detail)` shape
    /// of spec.md §6.
    pub fn whence(&self) -> &'static str {
        match self {
            ResolverError::DeviceNotLoadable(_)
            | ResolverError::RemoteDevicesDisabled
            | ResolverError::DeviceSignerNotTrusted(_)
            | ResolverError::ModuleNotAdmissable(_) => "device_loader",
            ResolverError::DeviceCall(_) => "execute",
            ResolverError::DefaultDeviceCouldNotResolveKey(_) => "dispatch",
            ResolverError::DepthExceeded => "normalize",
            ResolverError::Store(_) => "cache",
            ResolverError::JoinTimedOut => "group",
        }
    }

    pub fn detail(&self) -> FailureDetail {
        match self {
            ResolverError::DeviceCall(d) => d.clone(),
            other => FailureDetail::new(other.whence(), other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
