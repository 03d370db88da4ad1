//! Cerebras inference: OpenAI-compatible chat completions.

use crate::error::ModelError;
use crate::openai::OpenAiCompatibleChat;
use crate::settings::ProviderSettings;

pub const CEREBRAS_BASE_URL: &str = "https://api.cerebras.ai/v1";

pub fn cerebras_chat(settings: &ProviderSettings) -> Result<OpenAiCompatibleChat, ModelError> {
    let api_key = ProviderSettings::require(
        "cerebras",
        &settings.credentials.cerebras_api_key,
        "CEREBRAS_API_KEY",
    )?;
    OpenAiCompatibleChat::new(
        "cerebras",
        CEREBRAS_BASE_URL,
        api_key,
        settings.models.cerebras_model.clone(),
        settings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionProvider;
    use ghostwriter_core::config::CredentialsConfig;

    #[test]
    fn test_cerebras_requires_its_own_key() {
        let settings = ProviderSettings::new(
            Default::default(),
            CredentialsConfig {
                openai_api_key: Some("sk-openai".to_string()),
                ..Default::default()
            },
        );
        let err = cerebras_chat(&settings).unwrap_err();
        assert!(err.to_string().contains("CEREBRAS_API_KEY"));
    }

    #[test]
    fn test_cerebras_uses_configured_model() {
        let settings = ProviderSettings::new(
            Default::default(),
            CredentialsConfig {
                cerebras_api_key: Some("csk-test".to_string()),
                ..Default::default()
            },
        );
        let chat = cerebras_chat(&settings).unwrap();
        assert_eq!(chat.model(), "llama3.1-8b");
        assert_eq!(chat.name(), "cerebras");
    }
}
