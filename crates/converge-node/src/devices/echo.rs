//! An illustrative inline-map device, registered under the symbolic name
//! `echo@1.0`. Not part of the resolver core — it exists so the node's own
//! integration tests and a freshly-started node have something runnable to
//! resolve against without standing up a real device.

use std::sync::Arc;

use converge_resolver::device::{Device, DeviceInfo, Handler, HandlerFn1, HandlerFn2};
use converge_types::Value;

fn ping_handler() -> HandlerFn1 {
    Arc::new(|_input| Box::pin(async move { Ok(Value::text("pong")) }))
}

/// `echo(input, sub_input)`: returns `sub_input` unchanged, the way an
/// identity relay would.
fn echo_handler() -> HandlerFn2 {
    Arc::new(|_input, sub_input| Box::pin(async move { Ok(sub_input) }))
}

/// Builds the `echo@1.0` device.
pub fn device() -> Device {
    Device::new()
        .with_handler("ping", Handler::One(ping_handler()))
        .with_handler("echo", Handler::Two(echo_handler()))
        .with_info(DeviceInfo::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_returns_pong() {
        let device = device();
        let handler = device.handlers.get("ping").unwrap();
        let result = handler.call(&[Value::Bool(false)]).await.unwrap();
        assert_eq!(result, Value::text("pong"));
    }

    #[tokio::test]
    async fn echo_returns_sub_input_unchanged() {
        let device = device();
        let handler = device.handlers.get("echo").unwrap();
        let result = handler
            .call(&[Value::Bool(false), Value::text("hello")])
            .await
            .unwrap();
        assert_eq!(result, Value::text("hello"));
    }
}
