//! Integration test: direct key fetch against the default device.
//!
//! A plain message with no `device` field dispatches to the resolver's
//! built-in identity device, which simply returns the field named by the
//! sub-input. The output is a scalar, so its hashpath is left untouched.

use std::sync::Arc;

use converge_resolver::device::PreloadedDevices;
use converge_resolver::options::ResolveOptions;
use converge_resolver::Resolver;
use converge_store::CacheStore;
use converge_types::{Message, Options, Value};

async fn new_resolver() -> Arc<Resolver> {
    let cache = Arc::new(CacheStore::open_memory().expect("open in-memory cache"));
    Arc::new(Resolver::new(Some(cache), None))
}

#[tokio::test]
async fn direct_key_fetch_returns_the_field_value() {
    let resolver = new_resolver().await;
    let opts = ResolveOptions::new(Options::default(), Arc::new(PreloadedDevices::new()));

    let input = Message::new().with("a", Value::Int(1));
    let resolution = resolver
        .resolve(input, Value::text("a"), opts)
        .await
        .expect("resolve should not throw");

    assert_eq!(resolution.ok(), Some(Value::Int(1)));
}

#[tokio::test]
async fn scalar_output_does_not_extend_the_hashpath() {
    let resolver = new_resolver().await;
    let opts = ResolveOptions::new(Options::default(), Arc::new(PreloadedDevices::new()));

    let input = Message::new().with("a", Value::Int(1));
    let before = input.hashpath();

    let resolution = resolver.resolve(input, Value::text("a"), opts).await.unwrap();

    // The returned value is a scalar (`Value::Int`), which carries no
    // hashpath of its own — only message-shaped outputs are chained
    // (stage 6 of the resolver pipeline).
    assert!(resolution.ok().unwrap().as_message().is_none());
    assert_eq!(before, None);
}
