//! Shared state handed to every route handler.

use std::sync::Arc;
use std::time::Instant;

use ghostwriter_core::GhostwriterConfig;

use crate::coordinator::RelayHandle;

#[derive(Clone)]
pub struct AppState {
    /// Entry point to the coordinator task.
    pub relay: RelayHandle,
    pub config: Arc<GhostwriterConfig>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: GhostwriterConfig, relay: RelayHandle) -> Self {
        Self {
            relay,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
