//! converge-node: a single-process Converge resolver node.
//!
//! Runs a Tokio async runtime hosting the resolver (`converge-resolver`)
//! over its two SQLite-backed collaborators (`converge-store`'s cache and
//! content-addressed blob stores), and exposes the shortcut surface
//! (spec.md §4.9) over a line-delimited JSON-RPC Unix socket.

mod config;
mod devices;
mod rpc;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use converge_resolver::device::PreloadedDevices;
use converge_resolver::Resolver;
use converge_store::{BlobStore, CacheStore};

use crate::config::NodeConfig;
use crate::rpc::RpcServer;

/// Node-wide shared state handed to every RPC connection.
pub struct NodeState {
    pub resolver: Arc<Resolver>,
    pub preloaded: Arc<PreloadedDevices>,
    pub config: NodeConfig,
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("converge={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("converge-node starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let (cache, blobs) = if config.storage.in_memory {
        (CacheStore::open_memory()?, BlobStore::open_memory()?)
    } else {
        (
            CacheStore::open(&data_dir.join("cache.db"))?,
            BlobStore::open(&data_dir.join("blobs.db"))?,
        )
    };

    let resolver = Arc::new(Resolver::new(Some(Arc::new(cache)), Some(Arc::new(blobs))));

    let preloaded = Arc::new(PreloadedDevices::new());
    preloaded.register("echo@1.0", Arc::new(devices::echo::device()));

    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    let state = Arc::new(NodeState {
        resolver,
        preloaded,
        config: config.clone(),
        shutdown_tx: shutdown_tx.clone(),
    });

    let socket_path = config.socket_path();
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Node shutting down gracefully");
    let _ = std::fs::remove_file(&socket_path);
    info!("Node stopped");
    Ok(())
}
