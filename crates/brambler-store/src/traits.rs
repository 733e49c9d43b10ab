//! KeyBackend trait: the abstract interface over key-value stores.
//!
//! Values are opaque strings; record encoding lives in
//! [`brambler_core::MasterKeyRecord`].

use async_trait::async_trait;
use brambler_core::KeySource;

use crate::error::Result;

/// A string key-value store able to hold the master key record.
///
/// # Design Notes
///
/// - `is_supported` is a capability check. An unsupported backend is an
///   expected condition, and the fallback chain simply skips it.
/// - `remove` reports whether a value was present so that callers can tell
///   which backends were actually cleared.
#[async_trait]
pub trait KeyBackend: Send + Sync {
    /// Provenance tag for records served by this backend.
    fn source(&self) -> KeySource;

    /// Whether the backend can be used at all on this platform.
    async fn is_supported(&self) -> bool;

    /// Read the value stored under `item`.
    async fn get(&self, item: &str) -> Result<Option<String>>;

    /// Store `value` under `item`, replacing any previous value.
    async fn set(&self, item: &str, value: &str) -> Result<()>;

    /// Remove `item`. Returns `true` if a value was present.
    async fn remove(&self, item: &str) -> Result<bool>;
}
