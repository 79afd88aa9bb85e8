//! Integration test: a key's case and representation don't change its
//! canonical identity.
//!
//! `get("Key1", M) == get(:key1, M) == get("key1", M)` for any key whose
//! canonical form is `key1` — the key normalizer (spec.md §4.2) folds all
//! three to the same lookup before the default device ever sees them.

use std::sync::Arc;

use converge_resolver::device::PreloadedDevices;
use converge_resolver::options::ResolveOptions;
use converge_resolver::shortcut;
use converge_resolver::Resolver;
use converge_store::CacheStore;
use converge_types::{Message, Options, Value};

async fn new_resolver() -> Arc<Resolver> {
    let cache = Arc::new(CacheStore::open_memory().expect("open in-memory cache"));
    Arc::new(Resolver::new(Some(cache), None))
}

fn opts(preloaded: Arc<PreloadedDevices>) -> ResolveOptions {
    ResolveOptions::new(Options::default(), preloaded)
}

#[tokio::test]
async fn mixed_case_and_symbolic_keys_resolve_identically() {
    let resolver = new_resolver().await;
    let preloaded = Arc::new(PreloadedDevices::new());
    let input = Message::new().with("key1", Value::Int(9));

    let mixed_case = resolver
        .resolve(input.clone(), Value::text("Key1"), opts(preloaded.clone()))
        .await
        .unwrap();
    let lower_case = resolver
        .resolve(input.clone(), Value::text("key1"), opts(preloaded.clone()))
        .await
        .unwrap();
    let symbolic = resolver
        .resolve(input, Value::Symbol("key1".to_string()), opts(preloaded))
        .await
        .unwrap();

    assert_eq!(mixed_case.ok(), Some(Value::Int(9)));
    assert_eq!(mixed_case.ok(), lower_case.ok());
    assert_eq!(lower_case.ok(), symbolic.ok());
}

#[tokio::test]
async fn shortcut_get_also_folds_case_before_lookup() {
    let resolver = new_resolver().await;
    let preloaded = Arc::new(PreloadedDevices::new());
    let msg = Message::new().with("key1", Value::Int(9));

    let via_upper = shortcut::get(&resolver, "Key1", msg.clone(), None, opts(preloaded.clone())).await;
    let via_lower = shortcut::get(&resolver, "key1", msg, None, opts(preloaded)).await;

    assert_eq!(via_upper, Some(Value::Int(9)));
    assert_eq!(via_upper, via_lower);
}
