use thiserror::Error;

/// Top-level error type for the Ghostwriter system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for GhostwriterError` so that `?` works across
/// crate boundaries (most notably in the binary's composition root).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GhostwriterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential for provider '{provider}': set {variable}")]
    MissingCredential { provider: String, variable: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GhostwriterError {
    /// True for errors that must stop the process at startup.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            GhostwriterError::Config(_) | GhostwriterError::MissingCredential { .. }
        )
    }
}

impl From<toml::de::Error> for GhostwriterError {
    fn from(err: toml::de::Error) -> Self {
        GhostwriterError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for GhostwriterError {
    fn from(err: toml::ser::Error) -> Self {
        GhostwriterError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GhostwriterError {
    fn from(err: serde_json::Error) -> Self {
        GhostwriterError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Ghostwriter operations.
pub type Result<T> = std::result::Result<T, GhostwriterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GhostwriterError::Config("unknown provider".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown provider");
    }

    #[test]
    fn test_missing_credential_display_names_variable() {
        let err = GhostwriterError::MissingCredential {
            provider: "openai".to_string(),
            variable: "OPENAI_API_KEY".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("openai"));
        assert!(msg.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GhostwriterError = io_err.into();
        assert!(matches!(err, GhostwriterError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_becomes_config_error() {
        let parse_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: GhostwriterError = parse_err.into();
        assert!(matches!(err, GhostwriterError::Config(_)));
    }

    #[test]
    fn test_json_error_becomes_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: GhostwriterError = json_err.into();
        assert!(matches!(err, GhostwriterError::Serialization(_)));
    }

    #[test]
    fn test_fatal_at_startup() {
        assert!(GhostwriterError::Config("x".into()).is_fatal_at_startup());
        assert!(GhostwriterError::MissingCredential {
            provider: "google".into(),
            variable: "GOOGLE_API_KEY".into(),
        }
        .is_fatal_at_startup());
        assert!(!GhostwriterError::Provider("timeout".into()).is_fatal_at_startup());
        assert!(!GhostwriterError::StoreUnavailable("down".into()).is_fatal_at_startup());
    }
}
