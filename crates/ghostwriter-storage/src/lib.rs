//! Ghostwriter Storage crate - SQLite context store and read gateway.
//!
//! Provides a WAL-mode SQLite database with migrations, an implementation of
//! the context store contract (time-range, latest, recent, similarity, insert),
//! and the gateway the prompt assembler reads through.

pub mod db;
pub mod error;
pub mod gateway;
pub mod migrations;
pub mod store;
pub mod vector;

pub use db::Database;
pub use error::StoreError;
pub use gateway::ContextGateway;
pub use store::{ContextStore, NewRow, SimilarRow, SqliteContextStore, StoredRow};
pub use vector::cosine_similarity;
