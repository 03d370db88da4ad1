//! Ghostwriter Chat crate - prompt assembly and reply generation.
//!
//! Gathers windowed context through the storage gateway, renders a grounded
//! prompt, calls the completion provider, and parses the numbered reply list.

pub mod context;
pub mod error;
pub mod parser;
pub mod response;

pub use context::{AssembledPrompt, ContextBlock, PromptAssembler};
pub use error::ChatError;
pub use response::{candidates_from_text, validate_transition, GenerationState, ResponseGenerator};
