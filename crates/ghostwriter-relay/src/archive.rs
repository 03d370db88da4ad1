//! Persists selected replies as Q/A pairs so later prompts can retrieve them.

use std::sync::Arc;

use tracing::debug;

use ghostwriter_core::QaPair;
use ghostwriter_models::EmbeddingProvider;
use ghostwriter_storage::{ContextStore, NewRow};

use crate::error::RelayError;

pub struct QaArchive {
    store: Arc<dyn ContextStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QaArchive {
    pub fn new(store: Arc<dyn ContextStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Embed the pair's content and append it to its table. Returns the row id.
    pub async fn record(&self, pair: &QaPair) -> Result<i64, RelayError> {
        let embedding = self
            .embedder
            .embed(&pair.content)
            .await
            .map_err(|e| RelayError::Archive(e.to_string()))?;

        let row = NewRow {
            user_id: pair.user_id.clone(),
            sender_key: pair.sender_key.clone(),
            content: pair.content.clone(),
            timestamp: pair.timestamp,
            embedding: Some(embedding),
        };
        let id = self
            .store
            .insert_row(&pair.table_name, row)
            .await
            .map_err(|e| RelayError::Archive(e.to_string()))?;

        debug!(table = %pair.table_name, id, sender_key = %pair.sender_key, "Archived Q/A pair");
        Ok(id)
    }
}
