//! Error types for the Brambler session.

use brambler_cache::CacheError;
use brambler_core::{CoreError, KeySource};
use brambler_perms::{GatedAction, PermsError};
use brambler_store::{BackendFailure, StoreError};
use thiserror::Error;

/// Errors surfaced to the application.
///
/// Each variant is distinct so callers can render a different message for
/// storage, decryption, and permission problems.
#[derive(Debug, Error)]
pub enum BramblerError {
    /// Save attempted with a blank key. Nothing was written.
    #[error("master key is empty")]
    EmptyKey,

    /// Every backend refused the key. The previous record, if any, is intact.
    #[error("failed to persist master key to any backend")]
    StoragePersistFailure { failures: Vec<BackendFailure> },

    /// Clearing failed on at least one backend holding a record.
    #[error("failed to clear master key (cleared from {cleared_from:?})")]
    StorageClearFailure {
        cleared_from: Vec<KeySource>,
        failures: Vec<BackendFailure>,
    },

    /// The decrypt service rejected the key or failed. Carries the server's
    /// message verbatim when it sent one.
    #[error("{0}")]
    DecryptionFailure(String),

    /// A non-owner attempted a gated operation.
    #[error("permission denied: {action} requires the owner")]
    PermissionDenied { action: GatedAction },

    /// A reveal was attempted with no master key loaded.
    #[error("no master key loaded")]
    NoMasterKey,

    /// Any other storage error, such as every backend failing to read.
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for BramblerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EmptyKey => BramblerError::EmptyKey,
            StoreError::PersistFailure { failures } => {
                BramblerError::StoragePersistFailure { failures }
            }
            StoreError::ClearFailure {
                cleared_from,
                failures,
            } => BramblerError::StorageClearFailure {
                cleared_from,
                failures,
            },
            other => BramblerError::Storage(other),
        }
    }
}

impl From<CoreError> for BramblerError {
    fn from(e: CoreError) -> Self {
        StoreError::from(e).into()
    }
}

impl From<CacheError> for BramblerError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::DecryptionFailure(message) => BramblerError::DecryptionFailure(message),
        }
    }
}

impl From<PermsError> for BramblerError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::PermissionDenied { action } => BramblerError::PermissionDenied { action },
        }
    }
}

/// Result type for Brambler operations.
pub type Result<T> = std::result::Result<T, BramblerError>;
