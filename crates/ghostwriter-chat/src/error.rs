//! Error types for reply generation.

use ghostwriter_core::GhostwriterError;
use ghostwriter_models::ModelError;
use ghostwriter_storage::StoreError;

use crate::response::GenerationState;

/// Errors from prompt assembly and reply generation.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A similarity read failed with an I/O error. Window and history reads
    /// never produce this; they degrade to an empty block instead.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("provider error: {0}")]
    Provider(#[from] ModelError),

    #[error("invalid generation transition: {from} -> {to}")]
    InvalidTransition {
        from: GenerationState,
        to: GenerationState,
    },

    /// Generation aborted; `state` is where it stopped.
    #[error("generation failed while {state}: {source}")]
    Failed {
        state: GenerationState,
        #[source]
        source: Box<ChatError>,
    },
}

impl ChatError {
    /// The innermost cause, unwrapping any `Failed` layers.
    pub fn root_cause(&self) -> &ChatError {
        match self {
            ChatError::Failed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        ChatError::StoreUnavailable(err.to_string())
    }
}

impl From<ChatError> for GhostwriterError {
    fn from(err: ChatError) -> Self {
        match err.root_cause() {
            ChatError::StoreUnavailable(msg) => GhostwriterError::StoreUnavailable(msg.clone()),
            _ => GhostwriterError::Provider(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_includes_state_and_cause() {
        let err = ChatError::Failed {
            state: GenerationState::Completing,
            source: Box::new(ChatError::Provider(ModelError::Api {
                provider: "google",
                status: 503,
                body: "overloaded".to_string(),
            })),
        };
        let msg = err.to_string();
        assert!(msg.contains("completing"));
        assert!(msg.contains("overloaded"));
        assert!(matches!(err.root_cause(), ChatError::Provider(_)));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: ChatError = StoreError::Unavailable("disk I/O error".into()).into();
        assert!(matches!(err, ChatError::StoreUnavailable(ref m) if m.contains("disk I/O")));
    }

    #[test]
    fn test_conversion_to_top_level_error() {
        let err = ChatError::Failed {
            state: GenerationState::Assembling,
            source: Box::new(ChatError::StoreUnavailable("locked".into())),
        };
        let top: GhostwriterError = err.into();
        assert!(matches!(top, GhostwriterError::StoreUnavailable(_)));
    }
}
