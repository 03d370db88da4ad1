//! OpenAI embeddings and the OpenAI-compatible chat completions adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::ModelError;
use crate::http::{build_client, send_json};
use crate::settings::ProviderSettings;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// `POST /v1/embeddings` with `encoding_format: float`.
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedding")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiEmbedding {
    /// Validates the API key before any request is made.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ModelError> {
        let api_key = ProviderSettings::require(
            "openai",
            &settings.credentials.openai_api_key,
            "OPENAI_API_KEY",
        )?;
        Ok(Self {
            client: build_client("openai", settings.request_timeout())?,
            api_key,
            model: settings.models.openai_embedding_model.clone(),
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>, ModelError> {
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ModelError::InvalidResponse {
            provider: "openai",
            message: "embedding response contained no vectors".to_string(),
        })
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        if text.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        let request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": text,
                "encoding_format": "float",
            }));
        let response: EmbeddingResponse = send_json("openai", request).await?;
        let vector = first_embedding(response)?;
        debug!(model = %self.model, dimensions = vector.len(), "Embedded text");
        Ok(vector)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ---------------------------------------------------------------------------
// Chat completions
// ---------------------------------------------------------------------------

/// Chat completions against any endpoint speaking the OpenAI wire format.
///
/// Used directly for OpenAI and, with a different base URL and key, for Cerebras.
pub struct OpenAiCompatibleChat {
    provider: &'static str,
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl std::fmt::Debug for OpenAiCompatibleChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleChat")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiCompatibleChat {
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        api_key: String,
        model: String,
        settings: &ProviderSettings,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            provider,
            client: build_client(provider, settings.request_timeout())?,
            api_key,
            model,
            temperature: settings.models.temperature,
            base_url: base_url.into(),
        })
    }

    /// OpenAI chat completions using `models.openai_chat_model`.
    pub fn openai(settings: &ProviderSettings) -> Result<Self, ModelError> {
        let api_key = ProviderSettings::require(
            "openai",
            &settings.credentials.openai_api_key,
            "OPENAI_API_KEY",
        )?;
        Self::new(
            "openai",
            OPENAI_BASE_URL,
            api_key,
            settings.models.openai_chat_model.clone(),
            settings,
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text of the first choice; a missing or null message yields `""`.
pub(crate) fn chat_text(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default()
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleChat {
    async fn complete(&self, system_prompt: &str, query: &str) -> Result<String, ModelError> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": query},
                ],
                "temperature": self.temperature,
            }));
        let response: ChatResponse = send_json(self.provider, request).await?;
        Ok(chat_text(response))
    }

    fn name(&self) -> &str {
        self.provider
    }
}
