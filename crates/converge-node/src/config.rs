//! Node configuration: everything the resolver and its RPC surface need
//! that isn't baked into the binary.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use converge_types::Options;

/// Complete node configuration, loaded from `config.toml` with every
/// field falling back to a conservative default when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration: where the cache plane and content-addressed
/// store persist their SQLite databases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Run with in-memory stores instead of on-disk ones (useful for a
    /// throwaway local node).
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            in_memory: false,
        }
    }
}

/// The node-wide default resolver options (spec.md §6 "Options keys
/// recognized") — every RPC call starts from these unless the caller
/// overrides a field explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_true")]
    pub spawn_worker_allowed: bool,
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
    #[serde(default)]
    pub load_remote_devices: bool,
    /// Hex-encoded Ed25519 verifying keys trusted to sign remote device
    /// blobs (spec.md §4.3).
    #[serde(default)]
    pub trusted_device_signers: Vec<String>,
    #[serde(default = "default_max_resolution_depth")]
    pub max_resolution_depth: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            spawn_worker_allowed: true,
            worker_timeout_secs: default_worker_timeout_secs(),
            load_remote_devices: false,
            trusted_device_signers: Vec::new(),
            max_resolution_depth: default_max_resolution_depth(),
        }
    }
}

impl ResolverConfig {
    /// Builds the node-wide default [`Options`] this config describes.
    pub fn default_options(&self) -> Options {
        let mut options = Options::default();
        options.load_remote_devices = self.load_remote_devices;
        options.trusted_device_signers = self.trusted_device_signers.iter().cloned().collect();
        options.worker_timeout = Some(Duration::from_secs(self.worker_timeout_secs));
        options.max_resolution_depth = self.max_resolution_depth;
        options
    }
}

/// JSON-RPC surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Unix socket path. Empty = `$data_dir/converge.sock`.
    #[serde(default)]
    pub socket_path: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            socket_path: String::new(),
        }
    }
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_worker_timeout_secs() -> u64 {
    30
}

fn default_max_resolution_depth() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from the default config file location, falling
    /// back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: NodeConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        if self.rpc.socket_path.is_empty() {
            self.data_dir().join("converge.sock")
        } else {
            PathBuf::from(&self.rpc.socket_path)
        }
    }

    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("CONVERGE_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("CONVERGE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        dirs_fallback(".converge")
    }
}

fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/converge"))
}
