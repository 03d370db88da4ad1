use ghostwriter_core::GhostwriterError;
use thiserror::Error;

/// Outcome of a failed store read or write.
///
/// `NotFound` is the soft "no rows" case; `Unavailable` is an I/O failure.
/// Callers decide per read whether either one degrades or propagates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<StoreError> for GhostwriterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => GhostwriterError::StoreUnavailable(msg),
            StoreError::NotFound(msg) => GhostwriterError::NotFound(msg),
        }
    }
}
