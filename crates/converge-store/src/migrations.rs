//! Migration runner. Schema version stored in `PRAGMA user_version`.
//! Migrations are forward-only, matching the teacher daemon's own
//! convention for this store.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbError::Sqlite)?;

    if current_version == 0 {
        tracing::info!("Initializing converge-store schema v{SCHEMA_VERSION}");
        conn.execute_batch(schema::SCHEMA_V1).map_err(DbError::Sqlite)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(DbError::Sqlite)?;
    } else if current_version < SCHEMA_VERSION {
        for version in (current_version + 1)..=SCHEMA_VERSION {
            tracing::info!("Running migration to v{version}");
            run_migration(conn, version)?;
            conn.pragma_update(None, "user_version", version)
                .map_err(DbError::Sqlite)?;
        }
    } else if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

/// Run a specific migration.
fn run_migration(_conn: &Connection, version: u32) -> Result<()> {
    match version {
        // Future migrations go here.
        _ => Err(DbError::Migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_migration_sets_version() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("migrate");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn idempotent_on_second_run() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("first run");
        run(&conn).expect("second run should be a no-op");
    }

    #[test]
    fn tables_created() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("migrate");
        for table in ["cache_entries", "device_blobs"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap_or(0);
            assert_eq!(count, 1, "table '{table}' should exist");
        }
    }
}
