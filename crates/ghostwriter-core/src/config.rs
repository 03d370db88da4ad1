use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GhostwriterError, Result};
use crate::types::CONVERSATION_WINDOW_MS;

/// Top-level configuration for the Ghostwriter relay.
///
/// Loaded from `~/.ghostwriter/config.toml` by default. Each section
/// corresponds to one crate or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhostwriterConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl GhostwriterConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GhostwriterConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| GhostwriterError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite context store.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Port for the relay's HTTP and WebSocket listener.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.ghostwriter/data".to_string(),
            log_level: "info".to_string(),
            port: 3001,
        }
    }
}

/// Provider selection and model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Embedding provider tag (e.g. "openai").
    pub embedding: String,
    /// Completion provider tag (e.g. "openai", "google", "cerebras").
    pub completion: String,
    pub openai_embedding_model: String,
    pub openai_chat_model: String,
    pub google_model: String,
    pub cerebras_model: String,
    /// Sampling temperature for completions.
    pub temperature: f32,
    /// Per-request I/O timeout applied by the HTTP adapters.
    pub request_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding: "openai".to_string(),
            completion: "google".to_string(),
            openai_embedding_model: "text-embedding-3-small".to_string(),
            openai_chat_model: "gpt-4o-mini".to_string(),
            google_model: "gemini-2.0-flash-lite".to_string(),
            cerebras_model: "llama3.1-8b".to_string(),
            temperature: 0.7,
            request_timeout_secs: 60,
        }
    }
}

/// Provider API keys. Absent keys fall back to environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub cerebras_api_key: Option<String>,
}

impl CredentialsConfig {
    /// Fill every unset key from its environment variable.
    pub fn with_env_fallback(mut self) -> Self {
        fill_from_env(&mut self.openai_api_key, "OPENAI_API_KEY");
        fill_from_env(&mut self.google_api_key, "GOOGLE_API_KEY");
        fill_from_env(&mut self.cerebras_api_key, "CEREBRAS_API_KEY");
        self
    }
}

fn fill_from_env(slot: &mut Option<String>, variable: &str) {
    if slot.as_deref().map_or(true, str::is_empty) {
        *slot = std::env::var(variable).ok().filter(|v| !v.is_empty());
    }
}

/// Bounds for each context block of the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Length of the current-conversation window, ending at the latest message.
    pub window_ms: i64,
    /// Number of recent messages from the same sender.
    pub sender_history_limit: usize,
    /// Topical matches: count and minimum similarity.
    pub similar_top_k: usize,
    pub similar_threshold: f32,
    /// Stylistic matches: count and minimum similarity.
    pub style_top_k: usize,
    pub style_threshold: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_ms: CONVERSATION_WINDOW_MS,
            sender_history_limit: 10,
            similar_top_k: 5,
            similar_threshold: 0.7,
            style_top_k: 20,
            style_threshold: 0.3,
        }
    }
}

/// Logical tables inside the context store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Live message log: Q/A pairs, conversation windows, sender history.
    /// Archived pairs are also searched by similarity.
    pub message_table: String,
    /// Historical corpus searched by similarity.
    pub legacy_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            message_table: "messages".to_string(),
            legacy_table: "legacy_messages".to_string(),
        }
    }
}

/// Relay coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// User recorded on conversation-start Q/A pairs.
    pub default_user_id: String,
    /// Sender recorded on conversation-start Q/A pairs.
    pub default_sender_key: String,
    /// Buffer size of the coordinator's command and broadcast channels.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_user_id: "default_user".to_string(),
            default_sender_key: "default_sender".to_string(),
            channel_capacity: 256,
        }
    }
}
