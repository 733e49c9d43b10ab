//! Error types for Brambler Core.

use thiserror::Error;

/// Errors raised while building or decoding key material.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The key is empty after trimming whitespace.
    #[error("master key is empty")]
    EmptyKey,

    /// A stored record was written by a newer schema than this build reads.
    #[error("unsupported record version: found {found}, supported up to {supported}")]
    UnsupportedRecordVersion { found: u32, supported: u32 },

    /// A stored record could not be parsed.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
