//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| StoreError::Unavailable(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Unavailable(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: context_rows");
    }

    Ok(())
}

/// Version 1: one physical table holding every logical table's rows.
///
/// `embedding` is a little-endian f32 blob; NULL rows never match a
/// similarity query.
fn apply_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS context_rows (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name  TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            sender_key  TEXT NOT NULL,
            content     TEXT NOT NULL,
            timestamp   INTEGER NOT NULL,
            embedding   BLOB,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_context_rows_sender_time
            ON context_rows (table_name, sender_key, timestamp DESC);

        CREATE INDEX IF NOT EXISTS idx_context_rows_time
            ON context_rows (table_name, timestamp DESC);

        CREATE INDEX IF NOT EXISTS idx_context_rows_user
            ON context_rows (table_name, user_id);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'context_rows');
        ",
    )
    .map_err(|e| StoreError::Unavailable(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
