//! Integration test: handlers declared at arity 1, 2, and 3.
//!
//! The dispatcher always assembles the full `(input, sub-input, options)`
//! argument list and a handler simply uses as many as its declared arity
//! accepts (spec.md §4.4 rule 3). This drives a real device through the
//! resolver rather than calling `Handler::call` directly.

use std::sync::Arc;

use converge_resolver::device::{Device, Handler, HandlerFn1, HandlerFn2, HandlerFn3, PreloadedDevices};
use converge_resolver::options::ResolveOptions;
use converge_resolver::Resolver;
use converge_store::CacheStore;
use converge_types::{reserved, Message, Options, Value};

fn state_key_of(v: &Value) -> String {
    v.as_message()
        .and_then(|m| m.get("state_key"))
        .and_then(Value::as_text)
        .unwrap_or_default()
        .to_string()
}

fn msg_key_of(v: &Value) -> String {
    v.as_message()
        .and_then(|m| m.get("msg_key"))
        .and_then(Value::as_text)
        .unwrap_or_default()
        .to_string()
}

fn opts_key_of(v: &Value) -> String {
    v.as_message()
        .and_then(|m| m.get("opts_key"))
        .and_then(Value::as_text)
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn arity_1_2_3_handlers_see_the_arguments_their_arity_declares() {
    let preloaded = Arc::new(PreloadedDevices::new());

    let k1: HandlerFn1 = Arc::new(|state| Box::pin(async move { Ok(Value::text(state_key_of(&state))) }));
    let k2: HandlerFn2 = Arc::new(|state, sub| {
        Box::pin(async move { Ok(Value::text(format!("{}{}", state_key_of(&state), msg_key_of(&sub)))) })
    });
    let k3: HandlerFn3 = Arc::new(|state, sub, opts| {
        Box::pin(async move {
            Ok(Value::text(format!(
                "{}{}{}",
                state_key_of(&state),
                msg_key_of(&sub),
                opts_key_of(&opts)
            )))
        })
    });

    let device = Arc::new(
        Device::new()
            .with_handler("k1", Handler::One(k1))
            .with_handler("k2", Handler::Two(k2))
            .with_handler("k3", Handler::Three(k3)),
    );
    preloaded.register("arity-device@1.0", device);

    let cache = Arc::new(CacheStore::open_memory().expect("cache"));
    let resolver = Arc::new(Resolver::new(Some(cache), None));

    let state = Message::new()
        .with(reserved::DEVICE, Value::text("arity-device@1.0"))
        .with("state_key", Value::text("1"));
    let opts = ResolveOptions::new(Options::default(), preloaded);

    let r1 = resolver
        .resolve(
            state.clone(),
            Value::Message(Message::new().with(reserved::PATH, Value::text("k1")).with("msg_key", Value::text("2"))),
            opts.clone(),
        )
        .await
        .unwrap();
    assert_eq!(r1.ok(), Some(Value::text("1")));

    let r2 = resolver
        .resolve(
            state.clone(),
            Value::Message(Message::new().with(reserved::PATH, Value::text("k2")).with("msg_key", Value::text("3"))),
            opts.clone(),
        )
        .await
        .unwrap();
    assert_eq!(r2.ok(), Some(Value::text("13")));

    let mut opts3 = opts;
    opts3.extra = Message::new().with("opts_key", Value::text("37"));
    let r3 = resolver
        .resolve(
            state,
            Value::Message(Message::new().with(reserved::PATH, Value::text("k3")).with("msg_key", Value::text("3"))),
            opts3,
        )
        .await
        .unwrap();
    assert_eq!(r3.ok(), Some(Value::text("1337")));
}
