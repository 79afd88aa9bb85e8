//! # converge-store
//!
//! Backing store for two of the resolver's external collaborators (spec.md
//! §1, §6): the cache plane's memoization table and the content-addressed
//! store's device-blob side. The resolver treats both as black boxes behind
//! the `read`/`write` contracts in spec.md §6 — this crate is the concrete
//! SQLite-backed implementation those contracts are grounded against.
//!
//! Single SQLite database, WAL mode, schema version tracked in
//! `PRAGMA user_version`, the same shape the teacher daemon's own database
//! layer uses.

pub mod migrations;
pub mod schema;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use converge_types::{Hashpath, Message};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Store error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the store database at the given path.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (used by tests and the illustrative node
/// binary's default run mode).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The cache plane's backing store (spec.md §4.5, §6 "Cache contract").
///
/// Keyed by hashpath bytes, exactly as spec.md §4.5 and the "Invariants" in
/// §3 require ("an output marked as cacheable is stored under exactly one
/// hashpath"). `sub_input_path` is carried for diagnostics only; it plays
/// no role in the read/write key.
pub struct CacheStore {
    conn: Mutex<Connection>,
}

impl CacheStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open(path)?),
        })
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_memory()?),
        })
    }

    /// Reads the message memoized under `hashpath`, if any (spec.md §6
    /// `read(key, options)`).
    pub async fn read(&self, hashpath: Hashpath) -> Result<Option<Message>> {
        let conn = self.conn.lock().await;
        let row: Option<Vec<u8>> = conn
            .query_row(
                "SELECT message_json FROM cache_entries WHERE hashpath = ?1",
                params![hashpath.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(bytes) = row else {
            return Ok(None);
        };
        let message: Message =
            serde_json::from_slice(&bytes).map_err(|e| DbError::Serialization(e.to_string()))?;
        Ok(Some(message))
    }

    /// Writes `message` under `hashpath` (spec.md §6 `write(...)`).
    /// Idempotent: writing the same hashpath twice with identical content
    /// just overwrites the row, matching spec.md §5's requirement that
    /// writers be idempotent under identical hashpaths.
    pub async fn write(
        &self,
        hashpath: Hashpath,
        sub_input_path: Option<&str>,
        message: &Message,
    ) -> Result<()> {
        let bytes =
            serde_json::to_vec(message).map_err(|e| DbError::Serialization(e.to_string()))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO cache_entries (hashpath, sub_input_path, message_json, written_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(hashpath) DO UPDATE SET
                sub_input_path = excluded.sub_input_path,
                message_json = excluded.message_json,
                written_at = excluded.written_at",
            params![
                hashpath.as_bytes().as_slice(),
                sub_input_path,
                bytes,
                now_secs()
            ],
        )?;
        Ok(())
    }
}

/// A device blob as stored by the content-addressed store (spec.md §4.3
/// "Device loader", §6 "Store contract").
#[derive(Debug, Clone)]
pub struct DeviceBlob {
    pub content_id: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub signer_hex: String,
    pub signature: Vec<u8>,
}

/// The content-addressed store's device-blob side.
///
/// Backs `converge-resolver::device::load`'s remote-device path: fetch by
/// content id, check `signer_hex` against `trusted_device_signers`, verify
/// `signature` over `bytes` with `converge-crypto::ed25519`.
pub struct BlobStore {
    conn: Mutex<Connection>,
}

impl BlobStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open(path)?),
        })
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_memory()?),
        })
    }

    /// Stores a signed device blob.
    pub async fn put(&self, blob: &DeviceBlob) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO device_blobs
                (content_id, bytes, content_type, signer_hex, signature, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(content_id) DO UPDATE SET
                bytes = excluded.bytes,
                content_type = excluded.content_type,
                signer_hex = excluded.signer_hex,
                signature = excluded.signature",
            params![
                blob.content_id,
                blob.bytes,
                blob.content_type,
                blob.signer_hex,
                blob.signature,
                now_secs()
            ],
        )?;
        Ok(())
    }

    /// Fetches a device blob by its 43-character content id (spec.md §4.3,
    /// §6 `read(id, options) -> (ok, blob) | not_found`).
    pub async fn read(&self, content_id: &str) -> Result<Option<DeviceBlob>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT content_id, bytes, content_type, signer_hex, signature
             FROM device_blobs WHERE content_id = ?1",
            params![content_id],
            |row| {
                Ok(DeviceBlob {
                    content_id: row.get(0)?,
                    bytes: row.get(1)?,
                    content_type: row.get(2)?,
                    signer_hex: row.get(3)?,
                    signature: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(DbError::Sqlite)
    }
}
