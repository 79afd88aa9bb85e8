//! Integration test: a catch-all `handler` with an exclude list.
//!
//! A device publishing `handler: {func, exclude: [set]}` routes every key
//! except the excluded ones through `func`; an excluded key falls through
//! to the built-in default device instead, so `set` still works as it
//! normally would.

use std::sync::Arc;

use converge_resolver::device::{CatchAllHandler, Device, DeviceInfo, Handler, HandlerFn1, PreloadedDevices};
use converge_resolver::options::ResolveOptions;
use converge_resolver::Resolver;
use converge_store::CacheStore;
use converge_types::{reserved, Message, Options, Value};

#[tokio::test]
async fn excluded_key_falls_back_to_default_device_while_others_are_caught() {
    let preloaded = Arc::new(PreloadedDevices::new());
    let catch_all: HandlerFn1 = Arc::new(|_input| Box::pin(async move { Ok(Value::text("CAUGHT")) }));
    let device = Arc::new(Device::new().with_info(DeviceInfo {
        handler: Some(CatchAllHandler::WithExclude {
            func: Handler::One(catch_all),
            exclude: vec!["set".to_string()],
        }),
        ..Default::default()
    }));
    preloaded.register("excluder@1.0", device);

    let cache = Arc::new(CacheStore::open_memory().expect("cache"));
    let resolver = Arc::new(Resolver::new(Some(cache), None));

    let input = Message::new()
        .with(reserved::DEVICE, Value::text("excluder@1.0"))
        .with("a", Value::Int(1));
    let opts = ResolveOptions::new(Options::default(), preloaded);

    let non_excluded = resolver
        .resolve(input.clone(), Value::text("whatever"), opts.clone())
        .await
        .unwrap();
    assert_eq!(non_excluded.ok(), Some(Value::text("CAUGHT")));

    let patch = Value::Message(
        Message::new()
            .with(reserved::PATH, Value::text("set"))
            .with("b", Value::Int(2)),
    );
    let set_result = resolver.resolve(input, patch, opts).await.unwrap();
    let message = set_result.ok().unwrap().as_message().cloned().unwrap();
    assert_eq!(message.get("a"), Some(&Value::Int(1)));
    assert_eq!(message.get("b"), Some(&Value::Int(2)));
}
