//! Ghostwriter Models crate - embedding and completion providers.
//!
//! Provides the two capability traits the pipeline depends on, a registry
//! that builds concrete providers from configured tags, HTTP adapters for
//! the hosted backends, and deterministic fakes for testing.

pub mod cerebras;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod google;
mod http;
pub mod openai;
pub mod registry;
pub mod settings;

pub use completion::{CompletionProvider, ScriptedCompletion};
pub use embedding::{EmbeddingProvider, MockEmbedding};
pub use error::{ModelError, ProviderKind};
pub use registry::ModelRegistry;
pub use settings::ProviderSettings;
