use ghostwriter_core::GhostwriterError;
use thiserror::Error;

/// Which capability a provider tag was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Embedding,
    Completion,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Embedding => write!(f, "embedding"),
            ProviderKind::Completion => write!(f, "completion"),
        }
    }
}

/// Errors raised while constructing or calling a model provider.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unsupported {kind} provider: {tag}")]
    UnsupportedProvider { kind: ProviderKind, tag: String },

    #[error("Missing credential for provider '{provider}': set {variable}")]
    MissingCredential {
        provider: &'static str,
        variable: &'static str,
    },

    #[error("Request to {provider} failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API returned HTTP {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Cannot embed empty text")]
    EmptyInput,
}

impl ModelError {
    /// True for construction-time errors that should abort startup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ModelError::UnsupportedProvider { .. } | ModelError::MissingCredential { .. }
        )
    }
}

impl From<ModelError> for GhostwriterError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnsupportedProvider { .. } => GhostwriterError::Config(err.to_string()),
            ModelError::MissingCredential { provider, variable } => {
                GhostwriterError::MissingCredential {
                    provider: provider.to_string(),
                    variable: variable.to_string(),
                }
            }
            other => GhostwriterError::Provider(other.to_string()),
        }
    }
}
