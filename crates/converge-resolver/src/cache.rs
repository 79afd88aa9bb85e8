//! Cache plane (spec.md §4.5): read/write memoized results keyed by
//! hashpath, with cache-control negotiation across three sources.

use std::sync::Arc;

use converge_types::{reserved, CacheControlHeader, CacheMode, Hashpath, Message};
use converge_store::CacheStore;

use crate::error::Result;

/// Reads the message memoized under `hashpath`, if any (spec.md §4.5
/// "Read").
pub async fn read(cache: &CacheStore, hashpath: Hashpath) -> Result<Option<Message>> {
    Ok(cache.read(hashpath).await?)
}

/// `true` iff spec.md §4.5's write condition holds: the global option is
/// not a disabling token, and neither the input's nor the sub-input's
/// `Cache-Control` lists `no_cache`, `no_store`, or `no_transform`.
///
/// `cache::always` is options-wins: it forces caching even when a
/// `Cache-Control` source would otherwise forbid it, per spec.md §4.5's
/// "three cache-control sources in options-wins precedence".
pub fn should_cache(
    global: CacheMode,
    input: &Message,
    sub_input: &Message,
) -> bool {
    if global.disables_caching() {
        return false;
    }
    if global.forces_caching() {
        return true;
    }
    let input_disables = input
        .get(reserved::CACHE_CONTROL)
        .map(CacheControlHeader::from_value)
        .is_some_and(|cc| cc.disables_caching());
    let sub_disables = sub_input
        .get(reserved::CACHE_CONTROL)
        .map(CacheControlHeader::from_value)
        .is_some_and(|cc| cc.disables_caching());
    !(input_disables || sub_disables)
}

/// Writes `message` under `hashpath` synchronously, propagating a store
/// failure to the caller (spec.md §7: "Failures in stage 7... otherwise
/// escalate per the chosen strategy").
pub async fn write_sync(
    cache: &CacheStore,
    hashpath: Hashpath,
    sub_input_path: Option<&str>,
    message: &Message,
) -> Result<()> {
    cache.write(hashpath, sub_input_path, message).await?;
    Ok(())
}

/// Forks the write onto a background task (spec.md §6 `async_cache`). A
/// failed async write is logged and never propagates (spec.md §7: "non-
/// fatal when async").
pub fn write_async(
    cache: Arc<CacheStore>,
    hashpath: Hashpath,
    sub_input_path: Option<String>,
    message: Message,
) {
    tokio::spawn(async move {
        if let Err(error) = cache
            .write(hashpath, sub_input_path.as_deref(), &message)
            .await
        {
            tracing::warn!(%error, hashpath = %hashpath, "async cache write failed");
        }
    });
}
