//! Error types for the decryption cache.

use thiserror::Error;

use crate::boundary::BoundaryError;

/// Errors that can occur while populating the cache.
///
/// Cloneable so one failure can be handed to every coalesced caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The decrypt boundary rejected the key or failed. Carries the server's
    /// message when it supplied one.
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),
}

impl From<BoundaryError> for CacheError {
    fn from(e: BoundaryError) -> Self {
        CacheError::DecryptionFailure(e.message)
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
