//! Shared data model, wire events, configuration, and error taxonomy for the
//! Ghostwriter reply-drafting relay.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::GhostwriterConfig;
pub use error::{GhostwriterError, Result};
pub use types::*;
