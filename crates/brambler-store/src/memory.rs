//! In-memory implementation of the KeyBackend trait.
//!
//! Primarily for tests. It can impersonate either backend and can be
//! switched into an unsupported or failing mode to exercise the fallback
//! chain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use brambler_core::KeySource;
use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::traits::KeyBackend;

/// In-memory key backend.
///
/// All data is lost when the backend is dropped.
pub struct MemoryBackend {
    source: KeySource,
    items: RwLock<HashMap<String, String>>,
    supported: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty, supported, healthy backend.
    pub fn new(source: KeySource) -> Self {
        Self {
            source,
            items: RwLock::new(HashMap::new()),
            supported: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Simulate a platform without this capability.
    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    /// Make every `get` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `set` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `remove` fail.
    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Raw value currently stored under `item`, bypassing failure modes.
    pub fn peek(&self, item: &str) -> Option<String> {
        self.items.read().get(item).cloned()
    }

    /// Write a raw value, bypassing failure modes.
    pub fn seed(&self, item: &str, value: &str) {
        self.items.write().insert(item.to_string(), value.to_string());
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self, failing: &AtomicBool, op: &str) -> Result<()> {
        if !self.supported.load(Ordering::SeqCst) {
            return Err(StoreError::Unsupported(self.source));
        }
        if failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                backend: self.source,
                message: format!("simulated {op} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyBackend for MemoryBackend {
    fn source(&self) -> KeySource {
        self.source
    }

    async fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    async fn get(&self, item: &str) -> Result<Option<String>> {
        self.check(&self.fail_reads, "read")?;
        Ok(self.items.read().get(item).cloned())
    }

    async fn set(&self, item: &str, value: &str) -> Result<()> {
        self.check(&self.fail_writes, "write")?;
        self.items.write().insert(item.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, item: &str) -> Result<bool> {
        self.check(&self.fail_removes, "remove")?;
        Ok(self.items.write().remove(item).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_basic() {
        let backend = MemoryBackend::new(KeySource::Local);

        backend.set("k", "v").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));

        assert!(backend.remove("k").await.unwrap());
        assert!(!backend.remove("k").await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_backend_unsupported() {
        let backend = MemoryBackend::new(KeySource::Cloud);
        backend.set_supported(false);

        assert!(!backend.is_supported().await);
        let err = backend.set("k", "v").await.unwrap_err();
        assert!(matches!(err, StoreError::Unsupported(KeySource::Cloud)));
    }

    #[tokio::test]
    async fn test_memory_backend_failing_writes_keep_reads() {
        let backend = MemoryBackend::new(KeySource::Cloud);
        backend.seed("k", "old");
        backend.set_fail_writes(true);

        assert!(backend.set("k", "new").await.is_err());
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("old"));
        assert_eq!(backend.write_count(), 0);
    }
}
