//! Integration test: a chain of resolutions strictly extends the hashpath.
//!
//! Each `set` in a chain M0 -> M1 -> M2 links through
//! `hashpath(output) = H(hashpath(input) || commit(sub-input))`
//! (spec.md §3, §4.7 stage 6); every step's hashpath must therefore be
//! distinct from, and derived from, its predecessor's.

use std::sync::Arc;

use converge_resolver::device::PreloadedDevices;
use converge_resolver::options::ResolveOptions;
use converge_resolver::{shortcut, Resolver};
use converge_store::CacheStore;
use converge_types::{Message, Options, Value};

#[tokio::test]
async fn chained_sets_produce_strictly_distinct_hashpaths() {
    let cache = Arc::new(CacheStore::open_memory().expect("cache"));
    let resolver = Arc::new(Resolver::new(Some(cache), None));
    let preloaded = Arc::new(PreloadedDevices::new());
    let opts = || ResolveOptions::new(Options::default(), preloaded.clone());

    let m0 = Message::new();
    assert_eq!(m0.hashpath(), None);

    let m1 = shortcut::set(&resolver, m0, Message::new().with("a", Value::Int(1)), opts())
        .await
        .expect("first set");
    let hp1 = m1.hashpath().expect("m1 is hashpath-linked");

    let m2 = shortcut::set(&resolver, m1, Message::new().with("b", Value::Int(2)), opts())
        .await
        .expect("second set");
    let hp2 = m2.hashpath().expect("m2 is hashpath-linked");

    assert_ne!(hp1, hp2, "each resolution step must extend the hashpath");
    assert_eq!(m2.get("a"), Some(&Value::Int(1)));
    assert_eq!(m2.get("b"), Some(&Value::Int(2)));
}
