//! Provider registry: maps configured tags to provider constructors.
//!
//! New backends are added with [`ModelRegistry::register_embedding`] or
//! [`ModelRegistry::register_completion`]; the lookup path never changes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::cerebras::cerebras_chat;
use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::{ModelError, ProviderKind};
use crate::google::GeminiChat;
use crate::openai::{OpenAiCompatibleChat, OpenAiEmbedding};
use crate::settings::ProviderSettings;

pub type EmbeddingConstructor = Box<
    dyn Fn(&ProviderSettings) -> Result<Arc<dyn EmbeddingProvider>, ModelError> + Send + Sync,
>;

pub type CompletionConstructor = Box<
    dyn Fn(&ProviderSettings) -> Result<Arc<dyn CompletionProvider>, ModelError> + Send + Sync,
>;

pub struct ModelRegistry {
    settings: ProviderSettings,
    embedding: HashMap<String, EmbeddingConstructor>,
    completion: HashMap<String, CompletionConstructor>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("embedding", &self.embedding_tags())
            .field("completion", &self.completion_tags())
            .finish()
    }
}

impl ModelRegistry {
    /// An empty registry. Every lookup fails until providers are registered.
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            embedding: HashMap::new(),
            completion: HashMap::new(),
        }
    }

    /// Registry with the hosted providers: `openai` embeddings and
    /// `openai` / `google` / `cerebras` completions.
    pub fn with_defaults(settings: ProviderSettings) -> Self {
        let mut registry = Self::new(settings);
        registry.register_embedding("openai", |s| {
            Ok(Arc::new(OpenAiEmbedding::from_settings(s)?) as Arc<dyn EmbeddingProvider>)
        });
        registry.register_completion("openai", |s| {
            Ok(Arc::new(OpenAiCompatibleChat::openai(s)?) as Arc<dyn CompletionProvider>)
        });
        registry.register_completion("google", |s| {
            Ok(Arc::new(GeminiChat::from_settings(s)?) as Arc<dyn CompletionProvider>)
        });
        registry.register_completion("cerebras", |s| {
            Ok(Arc::new(cerebras_chat(s)?) as Arc<dyn CompletionProvider>)
        });
        registry
    }

    pub fn register_embedding<F>(&mut self, tag: impl Into<String>, constructor: F)
    where
        F: Fn(&ProviderSettings) -> Result<Arc<dyn EmbeddingProvider>, ModelError>
            + Send
            + Sync
            + 'static,
    {
        self.embedding.insert(tag.into(), Box::new(constructor));
    }

    pub fn register_completion<F>(&mut self, tag: impl Into<String>, constructor: F)
    where
        F: Fn(&ProviderSettings) -> Result<Arc<dyn CompletionProvider>, ModelError>
            + Send
            + Sync
            + 'static,
    {
        self.completion.insert(tag.into(), Box::new(constructor));
    }

    /// Construct the embedding provider registered under `tag`.
    ///
    /// Unknown tags fail with [`ModelError::UnsupportedProvider`] without
    /// invoking any constructor; missing credentials fail before any request.
    pub fn create_embedding_model(
        &self,
        tag: &str,
    ) -> Result<Arc<dyn EmbeddingProvider>, ModelError> {
        let constructor = self
            .embedding
            .get(tag)
            .ok_or_else(|| ModelError::UnsupportedProvider {
                kind: ProviderKind::Embedding,
                tag: tag.to_string(),
            })?;
        let provider = constructor(&self.settings)?;
        info!(tag, "Embedding provider ready");
        Ok(provider)
    }

    /// Construct the completion provider registered under `tag`.
    pub fn create_completion_model(
        &self,
        tag: &str,
    ) -> Result<Arc<dyn CompletionProvider>, ModelError> {
        let constructor = self
            .completion
            .get(tag)
            .ok_or_else(|| ModelError::UnsupportedProvider {
                kind: ProviderKind::Completion,
                tag: tag.to_string(),
            })?;
        let provider = constructor(&self.settings)?;
        info!(tag, "Completion provider ready");
        Ok(provider)
    }

    pub fn embedding_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.embedding.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn completion_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.completion.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;
    use crate::embedding::MockEmbedding;
    use ghostwriter_core::config::CredentialsConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn all_keys() -> ProviderSettings {
        ProviderSettings::new(
            Default::default(),
            CredentialsConfig {
                openai_api_key: Some("sk".into()),
                google_api_key: Some("g".into()),
                cerebras_api_key: Some("c".into()),
            },
        )
    }

    #[test]
    fn test_default_tags() {
        let registry = ModelRegistry::with_defaults(ProviderSettings::default());
        assert_eq!(registry.embedding_tags(), vec!["openai"]);
        assert_eq!(registry.completion_tags(), vec!["cerebras", "google", "openai"]);
    }

    #[test]
    fn test_unknown_tag_names_the_tag() {
        let registry = ModelRegistry::with_defaults(all_keys());
        let err = registry.create_completion_model("anthropic").err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("anthropic"));

        let err = registry.create_embedding_model("google").err().unwrap();
        assert!(matches!(
            err,
            ModelError::UnsupportedProvider {
                kind: ProviderKind::Embedding,
                ref tag,
            } if tag == "google"
        ));
    }

    #[test]
    fn test_unknown_tag_invokes_no_constructor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ModelRegistry::new(ProviderSettings::default());
        let counter = Arc::clone(&calls);
        registry.register_embedding("mock", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockEmbedding::new()) as Arc<dyn EmbeddingProvider>)
        });

        assert!(registry.create_embedding_model("missing").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        registry.create_embedding_model("mock").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_credential_reported_at_construction() {
        let registry = ModelRegistry::with_defaults(ProviderSettings::default());
        for tag in ["openai", "google", "cerebras"] {
            let err = registry.create_completion_model(tag).err().unwrap();
            assert!(
                matches!(err, ModelError::MissingCredential { .. }),
                "{tag} should need a credential"
            );
        }
        assert!(matches!(
            registry.create_embedding_model("openai").err().unwrap(),
            ModelError::MissingCredential { .. }
        ));
    }

    #[test]
    fn test_defaults_construct_with_credentials() {
        let registry = ModelRegistry::with_defaults(all_keys());
        assert_eq!(registry.create_embedding_model("openai").unwrap().name(), "openai");
        for tag in ["openai", "google", "cerebras"] {
            assert_eq!(registry.create_completion_model(tag).unwrap().name(), tag);
        }
    }

    #[tokio::test]
    async fn test_registered_provider_is_substitutable() {
        let mut registry = ModelRegistry::new(ProviderSettings::default());
        registry.register_completion("scripted", |_| {
            Ok(Arc::new(ScriptedCompletion::replying("1. hi")) as Arc<dyn CompletionProvider>)
        });
        let provider = registry.create_completion_model("scripted").unwrap();
        assert_eq!(provider.complete("sys", "q").await.unwrap(), "1. hi");
    }
}
