//! HTTP and WebSocket route handlers.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use ghostwriter_core::Timestamp;

use crate::error::ApiError;
use crate::queue::CorrelationEntry;
use crate::socket::{self, Producer, Reviewer};
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub pending_messages: u64,
}

/// One pending message as the reviewer sees it.
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingMessage {
    pub content: String,
    pub timestamp: Timestamp,
    pub sender_key: String,
    pub user_id: String,
    /// Empty while generation is still running.
    pub candidates: Vec<String>,
}

impl From<CorrelationEntry> for PendingMessage {
    fn from(entry: CorrelationEntry) -> Self {
        Self {
            content: entry.message.content,
            timestamp: entry.message.timestamp,
            sender_key: entry.message.sender_key,
            user_id: entry.message.user_id,
            candidates: entry.candidates,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
    pub pending: Vec<PendingMessage>,
    pub total: u64,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let pending = state.relay.snapshot().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        pending_messages: pending.len() as u64,
    }))
}

/// GET /queue - pending messages so a reconnecting reviewer can repopulate.
pub async fn queue(State(state): State<AppState>) -> Result<Json<QueueResponse>, ApiError> {
    let pending: Vec<PendingMessage> = state
        .relay
        .snapshot()
        .await?
        .into_iter()
        .map(PendingMessage::from)
        .collect();

    Ok(Json(QueueResponse {
        total: pending.len() as u64,
        pending,
    }))
}

/// GET /ws/messaging - producer channel.
pub async fn messaging_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| socket::serve::<Producer>(socket, state.relay))
}

/// GET /ws/frontend - reviewer channel.
pub async fn frontend_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| socket::serve::<Reviewer>(socket, state.relay))
}
