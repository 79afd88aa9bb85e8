//! Line-delimited JSON-RPC over a Unix socket.
//!
//! Exposes the resolver's shortcut surface (spec.md §4.9) plus the raw
//! `resolve` entry point (spec.md §6) as RPC methods. Every connection is
//! handled on its own spawned task; requests are newline-delimited JSON,
//! one object per line, matching the framing a JSON-RPC client over a
//! stream transport expects.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use converge_resolver::options::ResolveOptions;
use converge_resolver::shortcut::{self, KeysMode};
use converge_resolver::Resolution;
use converge_types::{Message, Options, Value};

use crate::NodeState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC success/error response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object (standard codes per the JSON-RPC 2.0 spec).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail.to_string()})),
        }
    }

    pub fn internal_error(detail: impl std::fmt::Display) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail.to_string()})),
        }
    }

    /// A resolution that reached `error_strategy == return` (spec.md §7):
    /// surfaced as its own code so clients can distinguish a resolver-level
    /// failure from a transport/protocol one.
    pub fn resolution_error(whence: &str, class: &str, reason: &str) -> Self {
        Self {
            code: -32000,
            message: whence.to_string(),
            data: Some(serde_json::json!({"class": class, "reason": reason})),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<NodeState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<NodeState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    state: Arc<NodeState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

async fn dispatch_request(state: Arc<NodeState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        "resolve" => resolve(&state, request.params).await,
        "get" => get(&state, request.params).await,
        "set" => set(&state, request.params).await,
        "set_deep" => set_deep(&state, request.params).await,
        "remove" => remove(&state, request.params).await,
        "keys" => keys(&state, request.params).await,
        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[derive(Deserialize)]
struct ResolveParams {
    input: Message,
    sub_input: Value,
    #[serde(default)]
    options: Option<Options>,
}

#[derive(Deserialize)]
struct GetParams {
    path: String,
    msg: Message,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    options: Option<Options>,
}

#[derive(Deserialize)]
struct SetParams {
    msg: Message,
    patch: Message,
    #[serde(default)]
    options: Option<Options>,
}

#[derive(Deserialize)]
struct SetDeepParams {
    msg: Message,
    key: String,
    value: Value,
    #[serde(default)]
    options: Option<Options>,
}

#[derive(Deserialize)]
struct RemoveParams {
    msg: Message,
    key: String,
    #[serde(default)]
    options: Option<Options>,
}

#[derive(Deserialize)]
struct KeysParams {
    msg: Message,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    options: Option<Options>,
}

fn resolve_options(state: &NodeState, override_options: Option<Options>) -> ResolveOptions {
    let options = override_options.unwrap_or_else(|| state.config.resolver.default_options());
    ResolveOptions::new(options, state.preloaded.clone())
}

fn parse_params<T: serde::de::DeserializeOwned>(params: serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(RpcError::invalid_params)
}

async fn resolve(state: &NodeState, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let params: ResolveParams = parse_params(params)?;
    let opts = resolve_options(state, params.options);
    let resolution = state
        .resolver
        .resolve(params.input, params.sub_input, opts)
        .await
        .map_err(RpcError::internal_error)?;
    resolution_to_json(resolution)
}

fn resolution_to_json(resolution: Resolution) -> Result<serde_json::Value, RpcError> {
    match resolution {
        Resolution::Ok(value) => serde_json::to_value(value).map_err(RpcError::internal_error),
        Resolution::Error { whence, detail } => {
            Err(RpcError::resolution_error(whence, &detail.class, &detail.reason))
        }
    }
}

async fn get(state: &NodeState, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let params: GetParams = parse_params(params)?;
    let opts = resolve_options(state, params.options);
    let value = shortcut::get(&state.resolver, &params.path, params.msg, params.default, opts).await;
    serde_json::to_value(value).map_err(RpcError::internal_error)
}

async fn set(state: &NodeState, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let params: SetParams = parse_params(params)?;
    let opts = resolve_options(state, params.options);
    let updated = shortcut::set(&state.resolver, params.msg, params.patch, opts)
        .await
        .map_err(RpcError::internal_error)?;
    serde_json::to_value(updated).map_err(RpcError::internal_error)
}

async fn set_deep(state: &NodeState, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let params: SetDeepParams = parse_params(params)?;
    let opts = resolve_options(state, params.options);
    let updated = shortcut::set_deep(&state.resolver, params.msg, &params.key, params.value, opts)
        .await
        .map_err(RpcError::internal_error)?;
    serde_json::to_value(updated).map_err(RpcError::internal_error)
}

async fn remove(state: &NodeState, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let params: RemoveParams = parse_params(params)?;
    let opts = resolve_options(state, params.options);
    let updated = shortcut::remove(&state.resolver, params.msg, &params.key, opts)
        .await
        .map_err(RpcError::internal_error)?;
    serde_json::to_value(updated).map_err(RpcError::internal_error)
}

async fn keys(state: &NodeState, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let params: KeysParams = parse_params(params)?;
    let opts = resolve_options(state, params.options);
    let mode = match params.mode.as_deref() {
        Some("remove") => KeysMode::ExcludingReserved,
        _ => KeysMode::All,
    };
    let keys = shortcut::keys(&state.resolver, params.msg, opts, mode)
        .await
        .map_err(RpcError::internal_error)?;
    serde_json::to_value(keys).map_err(RpcError::internal_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_carries_no_error() {
        let resp = RpcResponse::success(serde_json::json!(1), serde_json::json!({"a": 1}));
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn error_response_carries_no_result() {
        let resp = RpcResponse::error(serde_json::json!(1), RpcError::internal_error("boom"));
        assert!(resp.result.is_none());
        assert!(resp.error.is_some());
    }

    #[test]
    fn method_not_found_uses_standard_jsonrpc_code() {
        let err = RpcError::method_not_found("bogus");
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn parse_params_rejects_malformed_json() {
        let result: Result<GetParams, RpcError> = parse_params(serde_json::json!({"path": 1}));
        assert!(result.is_err());
    }
}
