//! Error types for the store module.

use std::fmt;

use brambler_core::{CoreError, KeySource};
use thiserror::Error;

/// One backend's failure inside a multi-backend operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub backend: KeySource,
    pub message: String,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.message)
    }
}

fn join_failures(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur during key persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Save attempted with a blank key.
    #[error("master key is empty")]
    EmptyKey,

    /// The backend is not available on this platform.
    #[error("{0} backend is not supported on this platform")]
    Unsupported(KeySource),

    /// A backend rejected a read or write.
    #[error("{backend} backend error: {message}")]
    Backend { backend: KeySource, message: String },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored record could not be decoded.
    #[error("record error: {0}")]
    Record(CoreError),

    /// Every backend failed to persist the key.
    #[error("failed to persist master key: {}", join_failures(.failures))]
    PersistFailure { failures: Vec<BackendFailure> },

    /// Every backend failed to read.
    #[error("failed to load master key: {}", join_failures(.failures))]
    LoadFailure { failures: Vec<BackendFailure> },

    /// At least one backend holding a record could not be cleared.
    #[error("failed to clear master key (cleared from {cleared_from:?}): {}", join_failures(.failures))]
    ClearFailure {
        cleared_from: Vec<KeySource>,
        failures: Vec<BackendFailure>,
    },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::EmptyKey => StoreError::EmptyKey,
            other => StoreError::Record(other),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
