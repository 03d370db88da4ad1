//! The context store RPC contract and its SQLite implementation.
//!
//! Every operation is scoped to a logical table name, so the live message
//! log and the legacy similarity corpus share one physical table.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ghostwriter_core::Timestamp;

use crate::db::Database;
use crate::error::StoreError;
use crate::vector::{cosine_similarity, decode_embedding, encode_embedding};

/// One stored message, as returned by the read operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: i64,
    pub table_name: String,
    pub user_id: String,
    pub sender_key: String,
    pub content: String,
    pub timestamp: Timestamp,
}

/// Fields for [`ContextStore::insert_row`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRow {
    pub user_id: String,
    pub sender_key: String,
    pub content: String,
    pub timestamp: Timestamp,
    pub embedding: Option<Vec<f32>>,
}

/// A similarity match with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarRow {
    pub row: StoredRow,
    pub similarity: f32,
}

/// The store's RPC contract.
///
/// Reads return empty collections (or `None`) when nothing matches; mapping
/// "no rows" to [`StoreError::NotFound`] is the gateway's job.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Rows in `table` for `user_id` with `similarity > min_similarity`,
    /// highest first, at most `top_k`. Rows of another dimension are skipped.
    async fn match_by_similarity(
        &self,
        table: &str,
        embedding: &[f32],
        user_id: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarRow>, StoreError>;

    /// Rows with `since <= timestamp <= until`, ascending by timestamp.
    async fn rows_in_time_range(
        &self,
        table: &str,
        sender_key: Option<&str>,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<StoredRow>, StoreError>;

    /// The most recent row, optionally for one sender.
    async fn latest_row(
        &self,
        table: &str,
        sender_key: Option<&str>,
    ) -> Result<Option<StoredRow>, StoreError>;

    /// The `limit` most recent rows for a sender, most recent first.
    async fn recent_rows(
        &self,
        table: &str,
        sender_key: &str,
        limit: usize,
    ) -> Result<Vec<StoredRow>, StoreError>;

    /// Append a row, returning its id.
    async fn insert_row(&self, table: &str, row: NewRow) -> Result<i64, StoreError>;
}

// ---------------------------------------------------------------------------
// SqliteContextStore
// ---------------------------------------------------------------------------

/// [`ContextStore`] over the local SQLite database.
///
/// Queries run on the blocking pool since rusqlite is synchronous.
#[derive(Debug, Clone)]
pub struct SqliteContextStore {
    db: Arc<Database>,
}

const ROW_COLUMNS: &str = "id, table_name, user_id, sender_key, content, timestamp";

impl SqliteContextStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Store task failed: {}", e)))?
    }

    /// Synchronous similarity scan, shared by the async path and benchmarks.
    pub fn scan_similar(
        db: &Database,
        table: &str,
        embedding: &[f32],
        user_id: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarRow>, StoreError> {
        if top_k == 0 || embedding.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ROW_COLUMNS}, embedding FROM context_rows
                 WHERE table_name = ?1 AND user_id = ?2 AND embedding IS NOT NULL"
            ))?;
            let rows = stmt.query_map(params![table, user_id], |row| {
                let blob: Vec<u8> = row.get(6)?;
                Ok((row_to_stored(row)?, blob))
            })?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })?;

        let mut skipped = 0usize;
        let mut scored: Vec<SimilarRow> = candidates
            .into_iter()
            .filter_map(|(row, blob)| {
                let stored = decode_embedding(&blob);
                match cosine_similarity(embedding, &stored) {
                    Some(similarity) => Some(SimilarRow { row, similarity }),
                    None => {
                        skipped += 1;
                        None
                    }
                }
            })
            .filter(|hit| hit.similarity > min_similarity)
            .collect();

        if skipped > 0 {
            debug!(table, skipped, "Skipped rows with incompatible embeddings");
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[async_trait]
impl ContextStore for SqliteContextStore {
    async fn match_by_similarity(
        &self,
        table: &str,
        embedding: &[f32],
        user_id: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarRow>, StoreError> {
        let table = table.to_string();
        let embedding = embedding.to_vec();
        let user_id = user_id.to_string();
        self.blocking(move |db| {
            Self::scan_similar(db, &table, &embedding, &user_id, top_k, min_similarity)
        })
        .await
    }

    async fn rows_in_time_range(
        &self,
        table: &str,
        sender_key: Option<&str>,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<StoredRow>, StoreError> {
        let table = table.to_string();
        let sender_key = sender_key.map(str::to_string);
        self.blocking(move |db| {
            db.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ROW_COLUMNS} FROM context_rows
                     WHERE table_name = ?1
                       AND (?2 IS NULL OR sender_key = ?2)
                       AND timestamp >= ?3 AND timestamp <= ?4
                     ORDER BY timestamp ASC, id ASC"
                ))?;
                let rows = stmt.query_map(
                    params![table, sender_key, since.0, until.0],
                    row_to_stored,
                )?;
                rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
            })
        })
        .await
    }

    async fn latest_row(
        &self,
        table: &str,
        sender_key: Option<&str>,
    ) -> Result<Option<StoredRow>, StoreError> {
        let table = table.to_string();
        let sender_key = sender_key.map(str::to_string);
        self.blocking(move |db| {
            db.with_conn(|conn| {
                let row = conn
                    .query_row(
                        &format!(
                            "SELECT {ROW_COLUMNS} FROM context_rows
                             WHERE table_name = ?1 AND (?2 IS NULL OR sender_key = ?2)
                             ORDER BY timestamp DESC, id DESC
                             LIMIT 1"
                        ),
                        params![table, sender_key],
                        row_to_stored,
                    )
                    .optional()?;
                Ok(row)
            })
        })
        .await
    }

    async fn recent_rows(
        &self,
        table: &str,
        sender_key: &str,
        limit: usize,
    ) -> Result<Vec<StoredRow>, StoreError> {
        let table = table.to_string();
        let sender_key = sender_key.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ROW_COLUMNS} FROM context_rows
                     WHERE table_name = ?1 AND sender_key = ?2
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?3"
                ))?;
                let rows = stmt.query_map(
                    params![table, sender_key, limit as i64],
                    row_to_stored,
                )?;
                rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
            })
        })
        .await
    }

    async fn insert_row(&self, table: &str, row: NewRow) -> Result<i64, StoreError> {
        let table = table.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| {
                let blob = row.embedding.as_deref().map(encode_embedding);
                conn.execute(
                    "INSERT INTO context_rows
                        (table_name, user_id, sender_key, content, timestamp, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        table,
                        row.user_id,
                        row.sender_key,
                        row.content,
                        row.timestamp.0,
                        blob
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
        })
        .await
    }
}

fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get(0)?,
        table_name: row.get(1)?,
        user_id: row.get(2)?,
        sender_key: row.get(3)?,
        content: row.get(4)?,
        timestamp: Timestamp(row.get(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> SqliteContextStore {
        SqliteContextStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn new_row(sender: &str, content: &str, ts: i64, embedding: Option<Vec<f32>>) -> NewRow {
        NewRow {
            user_id: "u1".to_string(),
            sender_key: sender.to_string(),
            content: content.to_string(),
            timestamp: Timestamp(ts),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_insert_and_latest() {
        let store = make_store();
        assert!(store.latest_row("messages", None).await.unwrap().is_none());

        store.insert_row("messages", new_row("alice", "a1", 100, None)).await.unwrap();
        store.insert_row("messages", new_row("bob", "b1", 200, None)).await.unwrap();

        let latest = store.latest_row("messages", None).await.unwrap().unwrap();
        assert_eq!(latest.content, "b1");
        let latest = store.latest_row("messages", Some("alice")).await.unwrap().unwrap();
        assert_eq!(latest.content, "a1");
        assert_eq!(latest.timestamp, Timestamp(100));
    }

    #[tokio::test]
    async fn test_tables_are_isolated() {
        let store = make_store();
        store.insert_row("legacy", new_row("alice", "old", 100, None)).await.unwrap();
        assert!(store.latest_row("messages", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_time_range_inclusive_and_ascending() {
        let store = make_store();
        for (content, ts) in [("c", 300), ("a", 100), ("b", 200), ("d", 400)] {
            store.insert_row("messages", new_row("alice", content, ts, None)).await.unwrap();
        }
        store.insert_row("messages", new_row("bob", "x", 250, None)).await.unwrap();

        let rows = store
            .rows_in_time_range("messages", Some("alice"), Timestamp(100), Timestamp(300))
            .await
            .unwrap();
        let contents: Vec<_> = rows.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);

        let rows = store
            .rows_in_time_range("messages", None, Timestamp(200), Timestamp(300))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_recent_rows_most_recent_first() {
        let store = make_store();
        for ts in 1..=5 {
            store
                .insert_row("messages", new_row("alice", &format!("m{ts}"), ts, None))
                .await
                .unwrap();
        }
        let rows = store.recent_rows("messages", "alice", 3).await.unwrap();
        let contents: Vec<_> = rows.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["m5", "m4", "m3"]);
    }

    #[tokio::test]
    async fn test_similarity_threshold_and_order() {
        let store = make_store();
        let rows = [
            ("exact", vec![1.0, 0.0]),
            ("close", vec![0.9, 0.1]),
            ("far", vec![0.0, 1.0]),
            ("wrong_dim", vec![1.0, 0.0, 0.0]),
        ];
        for (i, (content, emb)) in rows.into_iter().enumerate() {
            store
                .insert_row("legacy", new_row("alice", content, i as i64, Some(emb)))
                .await
                .unwrap();
        }
        store.insert_row("legacy", new_row("alice", "no_emb", 9, None)).await.unwrap();

        let hits = store
            .match_by_similarity("legacy", &[1.0, 0.0], "u1", 10, 0.5)
            .await
            .unwrap();
        let contents: Vec<_> = hits.iter().map(|h| h.row.content.as_str()).collect();
        assert_eq!(contents, vec!["exact", "close"]);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert!(hits.iter().all(|h| h.similarity > 0.5));
    }

    #[tokio::test]
    async fn test_similarity_threshold_is_strict() {
        let store = make_store();
        store
            .insert_row("legacy", new_row("alice", "orthogonal", 1, Some(vec![0.0, 1.0])))
            .await
            .unwrap();
        let hits = store
            .match_by_similarity("legacy", &[1.0, 0.0], "u1", 10, 0.0)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_similarity_scoped_to_user_and_top_k() {
        let store = make_store();
        for i in 0..5 {
            store
                .insert_row("legacy", new_row("alice", &format!("m{i}"), i, Some(vec![1.0, 0.1 * i as f32])))
                .await
                .unwrap();
        }
        let mut other = new_row("alice", "other user", 9, Some(vec![1.0, 0.0]));
        other.user_id = "u2".to_string();
        store.insert_row("legacy", other).await.unwrap();

        let hits = store
            .match_by_similarity("legacy", &[1.0, 0.0], "u1", 2, 0.3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].row.content, "m0");
        assert!(hits.iter().all(|h| h.row.user_id == "u1"));
    }
}
