use std::time::Duration;

use ghostwriter_core::config::{CredentialsConfig, ModelsConfig};
use ghostwriter_core::GhostwriterConfig;

use crate::error::ModelError;

/// Everything a provider constructor may need: model names, sampling
/// parameters, and resolved credentials.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub models: ModelsConfig,
    pub credentials: CredentialsConfig,
}

impl ProviderSettings {
    /// Settings as written, without consulting the environment.
    pub fn new(models: ModelsConfig, credentials: CredentialsConfig) -> Self {
        Self {
            models,
            credentials,
        }
    }

    /// Settings from the loaded config, with unset keys taken from the environment.
    pub fn from_config(config: &GhostwriterConfig) -> Self {
        Self::new(
            config.models.clone(),
            config.credentials.clone().with_env_fallback(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.models.request_timeout_secs.max(1))
    }

    pub(crate) fn require(
        provider: &'static str,
        value: &Option<String>,
        variable: &'static str,
    ) -> Result<String, ModelError> {
        match value.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(ModelError::MissingCredential { provider, variable }),
        }
    }
}
