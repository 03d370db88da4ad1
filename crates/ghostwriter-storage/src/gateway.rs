//! Read-only accessors over the context store.
//!
//! Each read returns message contents bounded by a window (time range, row
//! count, or similarity score). "No rows" is always `StoreError::NotFound`,
//! never an empty `Ok`, so callers must decide explicitly how to degrade.

use std::sync::Arc;

use tracing::debug;

use ghostwriter_core::{ContextWindow, Timestamp};

use crate::error::StoreError;
use crate::store::ContextStore;

#[derive(Clone)]
pub struct ContextGateway {
    store: Arc<dyn ContextStore>,
    message_table: String,
    legacy_table: String,
}

impl std::fmt::Debug for ContextGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGateway")
            .field("message_table", &self.message_table)
            .field("legacy_table", &self.legacy_table)
            .finish()
    }
}

impl ContextGateway {
    pub fn new(
        store: Arc<dyn ContextStore>,
        message_table: impl Into<String>,
        legacy_table: impl Into<String>,
    ) -> Self {
        Self {
            store,
            message_table: message_table.into(),
            legacy_table: legacy_table.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    pub fn message_table(&self) -> &str {
        &self.message_table
    }

    /// Timestamp of the most recent live message, optionally for one sender.
    pub async fn latest_timestamp(&self, sender_key: Option<&str>) -> Result<Timestamp, StoreError> {
        self.store
            .latest_row(&self.message_table, sender_key)
            .await?
            .map(|row| row.timestamp)
            .ok_or_else(|| {
                StoreError::NotFound(match sender_key {
                    Some(sender) => format!("no messages from sender {}", sender),
                    None => "no messages".to_string(),
                })
            })
    }

    /// Contents of live messages inside `window`, ascending by timestamp.
    pub async fn messages_in_window(&self, window: &ContextWindow) -> Result<Vec<String>, StoreError> {
        let rows = self
            .store
            .rows_in_time_range(
                &self.message_table,
                window.sender_key(),
                window.since(),
                window.until(),
            )
            .await?;
        debug!(
            since = window.since().0,
            until = window.until().0,
            rows = rows.len(),
            "Read conversation window"
        );
        non_empty(
            rows.into_iter().map(|r| r.content).collect(),
            "no messages in window",
        )
    }

    /// The `limit` most recent live messages from a sender, most recent first.
    pub async fn recent_by_sender(
        &self,
        sender_key: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let rows = self
            .store
            .recent_rows(&self.message_table, sender_key, limit)
            .await?;
        non_empty(
            rows.into_iter().map(|r| r.content).collect(),
            "no sender history",
        )
    }

    /// Messages for `user_id` above `min_similarity`, best match first.
    ///
    /// Searches the legacy corpus and the live message table, so archived
    /// Q/A pairs are retrievable alongside imported history.
    pub async fn similarity_search(
        &self,
        embedding: &[f32],
        user_id: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<String>, StoreError> {
        let mut hits = self
            .store
            .match_by_similarity(&self.legacy_table, embedding, user_id, top_k, min_similarity)
            .await?;
        if self.message_table != self.legacy_table {
            hits.extend(
                self.store
                    .match_by_similarity(&self.message_table, embedding, user_id, top_k, min_similarity)
                    .await?,
            );
            hits.sort_by(|a, b| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            hits.truncate(top_k);
        }
        debug!(
            user_id,
            top_k,
            min_similarity,
            hits = hits.len(),
            "Similarity search"
        );
        non_empty(
            hits.into_iter().map(|h| h.row.content).collect(),
            "no similar messages",
        )
    }
}

fn non_empty(contents: Vec<String>, what: &str) -> Result<Vec<String>, StoreError> {
    if contents.is_empty() {
        Err(StoreError::NotFound(what.to_string()))
    } else {
        Ok(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::{NewRow, SqliteContextStore};
    use ghostwriter_core::CONVERSATION_WINDOW_MS;

    async fn make_gateway(rows: &[(&str, &str, i64)]) -> ContextGateway {
        let store = SqliteContextStore::new(Arc::new(Database::in_memory().unwrap()));
        for (sender, content, ts) in rows {
            store
                .insert_row(
                    "messages",
                    NewRow {
                        user_id: "u1".to_string(),
                        sender_key: sender.to_string(),
                        content: content.to_string(),
                        timestamp: Timestamp(*ts),
                        embedding: None,
                    },
                )
                .await
                .unwrap();
        }
        ContextGateway::new(Arc::new(store), "messages", "legacy")
    }

    #[tokio::test]
    async fn test_latest_timestamp_not_found_when_empty() {
        let gateway = make_gateway(&[]).await;
        let err = gateway.latest_timestamp(Some("alice")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_window_boundaries() {
        let latest = 1_000_000;
        let edge = latest - CONVERSATION_WINDOW_MS;
        let gateway = make_gateway(&[
            ("alice", "too old", edge - 1),
            ("alice", "at edge", edge),
            ("alice", "middle", edge + 1000),
            ("bob", "other sender", edge + 2000),
            ("alice", "latest", latest),
        ])
        .await;

        let ts = gateway.latest_timestamp(Some("alice")).await.unwrap();
        assert_eq!(ts, Timestamp(latest));

        let window = ContextWindow::trailing(ts, CONVERSATION_WINDOW_MS, Some("alice".into()));
        let contents = gateway.messages_in_window(&window).await.unwrap();
        assert_eq!(contents, vec!["at edge", "middle", "latest"]);
    }

    #[tokio::test]
    async fn test_recent_by_sender_limit() {
        let gateway = make_gateway(&[("alice", "one", 1), ("alice", "two", 2), ("alice", "three", 3)]).await;
        let contents = gateway.recent_by_sender("alice", 2).await.unwrap();
        assert_eq!(contents, vec!["three", "two"]);
        assert!(gateway.recent_by_sender("carol", 2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_similarity_search_empty_is_not_found() {
        let gateway = make_gateway(&[]).await;
        let err = gateway
            .similarity_search(&[1.0, 0.0], "u1", 5, 0.7)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_similarity_search_merges_archive_and_legacy() {
        let store = SqliteContextStore::new(Arc::new(Database::in_memory().unwrap()));
        let seeds = [
            ("legacy", "old topical", vec![0.9, 0.436]),
            ("messages", "archived pair", vec![1.0, 0.0]),
            ("legacy", "unrelated", vec![0.0, 1.0]),
        ];
        for (i, (table, content, embedding)) in seeds.into_iter().enumerate() {
            store
                .insert_row(
                    table,
                    NewRow {
                        user_id: "u1".to_string(),
                        sender_key: "alice".to_string(),
                        content: content.to_string(),
                        timestamp: Timestamp(i as i64),
                        embedding: Some(embedding),
                    },
                )
                .await
                .unwrap();
        }
        let gateway = ContextGateway::new(Arc::new(store), "messages", "legacy");

        let contents = gateway
            .similarity_search(&[1.0, 0.0], "u1", 5, 0.7)
            .await
            .unwrap();
        assert_eq!(contents, vec!["archived pair", "old topical"]);

        let top = gateway
            .similarity_search(&[1.0, 0.0], "u1", 1, 0.7)
            .await
            .unwrap();
        assert_eq!(top, vec!["archived pair"]);
    }
}
