//! SQL schema for the cache plane and the content-addressed device store
//! (spec.md §6 "Cache contract", "Store contract").

/// Schema for the `converge-store` database.
///
/// Two tables, matching the two external collaborators spec.md §1 calls
/// out: the cache plane's backing store (`cache_entries`) and the
/// content-addressed store's device-blob side (`device_blobs`).
pub const SCHEMA_V1: &str = r#"
-- The cache plane (spec.md §4.5): memoized resolution outputs keyed by
-- hashpath bytes. `sub_input_path` is stored alongside the hashpath purely
-- for diagnostics/eviction tooling — the resolver's own read/write keys
-- only ever address rows by `hashpath`.
CREATE TABLE IF NOT EXISTS cache_entries (
    hashpath BLOB PRIMARY KEY,
    sub_input_path TEXT,
    message_json BLOB NOT NULL,
    written_at INTEGER NOT NULL
);

-- The content-addressed store's device-blob side (spec.md §4.3 "Device
-- loader", §6 "Store contract"). `content_id` is the 43-character id
-- derived from `blake3::hash(bytes)` and rendered via
-- `converge_types::content_id::encode`.
CREATE TABLE IF NOT EXISTS device_blobs (
    content_id TEXT PRIMARY KEY,
    bytes BLOB NOT NULL,
    content_type TEXT NOT NULL,
    signer_hex TEXT NOT NULL,
    signature BLOB NOT NULL,
    stored_at INTEGER NOT NULL
);
"#;
