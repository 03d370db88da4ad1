//! Google Gemini `generateContent` with a system instruction.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::completion::CompletionProvider;
use crate::error::ModelError;
use crate::http::{build_client, send_json};
use crate::settings::ProviderSettings;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiChat {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl std::fmt::Debug for GeminiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiChat")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiChat {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ModelError> {
        let api_key = ProviderSettings::require(
            "google",
            &settings.credentials.google_api_key,
            "GOOGLE_API_KEY",
        )?;
        Ok(Self {
            client: build_client("google", settings.request_timeout())?,
            api_key,
            model: settings.models.google_model.clone(),
            temperature: settings.models.temperature,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenated text parts of the first candidate, or `""`.
fn candidate_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl CompletionProvider for GeminiChat {
    async fn complete(&self, system_prompt: &str, query: &str) -> Result<String, ModelError> {
        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "systemInstruction": {"parts": [{"text": system_prompt}]},
                "contents": [{"role": "user", "parts": [{"text": query}]}],
                "generationConfig": {"temperature": self.temperature},
            }));
        let response: GenerateResponse = send_json("google", request).await?;
        Ok(candidate_text(response))
    }

    fn name(&self) -> &str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::decode_body;
    use ghostwriter_core::config::CredentialsConfig;

    #[test]
    fn test_requires_google_key() {
        let err = GeminiChat::from_settings(&ProviderSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::MissingCredential {
                provider: "google",
                ..
            }
        ));
    }

    #[test]
    fn test_endpoint_includes_model() {
        let settings = ProviderSettings::new(
            Default::default(),
            CredentialsConfig {
                google_api_key: Some("g-test".to_string()),
                ..Default::default()
            },
        );
        let chat = GeminiChat::from_settings(&settings).unwrap();
        assert_eq!(
            chat.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_parse_candidate_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"1. sure"},{"text":"\n2. ok"}]}}]}"#;
        let response: GenerateResponse = decode_body("google", body).unwrap();
        assert_eq!(candidate_text(response), "1. sure\n2. ok");
    }

    #[test]
    fn test_blocked_response_is_empty_text() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}],"promptFeedback":{}}"#;
        let response: GenerateResponse = decode_body("google", body).unwrap();
        assert_eq!(candidate_text(response), "");
    }
}
