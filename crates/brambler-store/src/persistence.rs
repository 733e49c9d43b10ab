//! The key persistence fallback chain.
//!
//! Backends are tried in order. The first backend is the preferred
//! (cloud-synced) store, the last is the device-local terminal fallback.
//! Callers never learn which backend did the work beyond the record's
//! `source` tag.

use std::sync::Arc;

use brambler_core::{KeySource, MasterKey, MasterKeyRecord};
use tracing::{debug, info, warn};

use crate::error::{BackendFailure, Result, StoreError};
use crate::traits::KeyBackend;

/// Outcome of a successful [`KeyPersistence::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Backends that held a record and had it removed, in chain order.
    pub cleared_from: Vec<KeySource>,
}

impl ClearReport {
    pub fn cleared_anything(&self) -> bool {
        !self.cleared_from.is_empty()
    }
}

/// Ordered chain of key backends.
pub struct KeyPersistence {
    item_key: String,
    backends: Vec<Arc<dyn KeyBackend>>,
}

impl KeyPersistence {
    /// Create a chain storing the record under `item_key`.
    ///
    /// `backends` is tried front to back.
    pub fn new(item_key: impl Into<String>, backends: Vec<Arc<dyn KeyBackend>>) -> Self {
        Self {
            item_key: item_key.into(),
            backends,
        }
    }

    /// The usual two-backend chain: cloud first, local as the fallback.
    pub fn cloud_then_local(
        item_key: impl Into<String>,
        cloud: Arc<dyn KeyBackend>,
        local: Arc<dyn KeyBackend>,
    ) -> Self {
        Self::new(item_key, vec![cloud, local])
    }

    pub fn item_key(&self) -> &str {
        &self.item_key
    }

    /// Persist `key` to the first backend that accepts it.
    ///
    /// A blank key is rejected before any backend is touched. If a backend
    /// later in the chain accepts the write, stale records left in the
    /// earlier backends are removed on a best-effort basis so that a later
    /// `load` cannot resurrect an older key.
    pub async fn save(&self, key: &str) -> Result<MasterKeyRecord> {
        let key = MasterKey::new(key)?;
        let saved_at = now_millis();
        let mut failures = Vec::new();

        for (position, backend) in self.backends.iter().enumerate() {
            let source = backend.source();
            if !backend.is_supported().await {
                debug!(%source, "backend unsupported, skipping save");
                failures.push(BackendFailure {
                    backend: source,
                    message: "unsupported".to_string(),
                });
                continue;
            }

            let record = MasterKeyRecord::new(key.clone(), source, saved_at);
            let encoded = record.to_json()?;

            match backend.set(&self.item_key, &encoded).await {
                Ok(()) => {
                    info!(%source, fingerprint = %key.fingerprint(), "master key saved");
                    if position > 0 {
                        self.evict_before(position).await;
                    }
                    return Ok(record);
                }
                Err(e) => {
                    warn!(%source, error = %e, "master key save failed, falling back");
                    failures.push(BackendFailure {
                        backend: source,
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(StoreError::PersistFailure { failures })
    }

    /// Read the newest usable record across the chain.
    ///
    /// When several backends hold a record, the greatest `saved_at` wins and
    /// ties go to the earlier backend. Legacy records carry `saved_at` 0.
    /// Returns `Ok(None)` when no backend holds a record. Errors only when
    /// every supported backend failed outright.
    pub async fn load(&self) -> Result<Option<MasterKeyRecord>> {
        let mut failures = Vec::new();
        let mut answered = false;
        let mut newest: Option<MasterKeyRecord> = None;

        for backend in &self.backends {
            let source = backend.source();
            if !backend.is_supported().await {
                debug!(%source, "backend unsupported, skipping load");
                continue;
            }

            let raw = match backend.get(&self.item_key).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(%source, error = %e, "master key read failed, falling back");
                    failures.push(BackendFailure {
                        backend: source,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let Some(raw) = raw else {
                answered = true;
                continue;
            };

            match MasterKeyRecord::decode(&raw, source) {
                Ok(Some(record)) => {
                    answered = true;
                    match &newest {
                        Some(best) if best.saved_at >= record.saved_at => {
                            debug!(%source, "older master key record ignored");
                        }
                        _ => newest = Some(record),
                    }
                }
                Ok(None) => answered = true,
                Err(e) => {
                    warn!(%source, error = %e, "unusable master key record, falling back");
                    failures.push(BackendFailure {
                        backend: source,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(record) = newest {
            info!(source = %record.source, version = record.version, "master key loaded");
            return Ok(Some(record));
        }
        if !answered && !failures.is_empty() {
            return Err(StoreError::LoadFailure { failures });
        }
        Ok(None)
    }

    /// Remove the record from every backend that holds one.
    ///
    /// Backends without a record, and unsupported backends, are not errors.
    pub async fn clear(&self) -> Result<ClearReport> {
        let mut report = ClearReport::default();
        let mut failures = Vec::new();

        for backend in &self.backends {
            let source = backend.source();
            if !backend.is_supported().await {
                continue;
            }
            match backend.remove(&self.item_key).await {
                Ok(true) => report.cleared_from.push(source),
                Ok(false) => {}
                Err(e) => {
                    warn!(%source, error = %e, "master key clear failed");
                    failures.push(BackendFailure {
                        backend: source,
                        message: e.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(StoreError::ClearFailure {
                cleared_from: report.cleared_from,
                failures,
            });
        }

        info!(cleared_from = ?report.cleared_from, "master key cleared");
        Ok(report)
    }

    /// Best-effort removal of records from backends ahead of `position`.
    async fn evict_before(&self, position: usize) {
        for backend in &self.backends[..position] {
            if !backend.is_supported().await {
                continue;
            }
            if let Err(e) = backend.remove(&self.item_key).await {
                debug!(source = %backend.source(), error = %e, "could not evict stale record");
            }
        }
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
