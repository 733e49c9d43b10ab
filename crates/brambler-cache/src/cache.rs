//! The decryption cache.
//!
//! Holds the mappings from the last successful decrypt-all, tagged with the
//! fingerprint of the key they were decrypted under, and runs at most one
//! decrypt-all at a time.
//!
//! ## Request Lifecycle
//!
//! 1. A caller asks for the mappings of a key
//! 2. If the cache already holds them, they are returned with no call
//! 3. If a request for the same key is in flight, the caller waits on it
//! 4. Otherwise the caller issues the request under a fresh token
//! 5. The response is applied only if the token is still current
//!
//! A failed request never evicts what the cache already holds.

use std::sync::Arc;

use brambler_core::{IdentityMappings, KeyFingerprint, MappingKind, MasterKey};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::boundary::DecryptBoundary;
use crate::error::{CacheError, Result};

/// How a [`DecryptionCache::decrypt_all`] call was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Already cached under this key. No call was made.
    Cached(Arc<IdentityMappings>),
    /// A decrypt-all call, this caller's or one it joined, populated the cache.
    Decrypted(Arc<IdentityMappings>),
    /// The key changed while the call was outstanding. The response was
    /// dropped and the cache left untouched.
    Discarded,
}

impl DecryptOutcome {
    pub fn mappings(&self) -> Option<&Arc<IdentityMappings>> {
        match self {
            DecryptOutcome::Cached(m) | DecryptOutcome::Decrypted(m) => Some(m),
            DecryptOutcome::Discarded => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, DecryptOutcome::Discarded)
    }
}

type Shared = Result<DecryptOutcome>;

struct Populated {
    fingerprint: KeyFingerprint,
    mappings: Arc<IdentityMappings>,
}

struct Pending {
    token: u64,
    fingerprint: KeyFingerprint,
    result: watch::Receiver<Option<Shared>>,
}

impl Pending {
    /// False once the issuing caller has gone away without answering.
    fn is_live(&self) -> bool {
        self.result.has_changed().is_ok()
    }
}

#[derive(Default)]
struct Session {
    token: u64,
    /// Key of the most recent request, cleared by invalidation.
    current: Option<KeyFingerprint>,
    populated: Option<Populated>,
    pending: Option<Pending>,
}

enum Step {
    Ready(Shared),
    Join(watch::Receiver<Option<Shared>>),
    Lead {
        token: u64,
        result: watch::Sender<Option<Shared>>,
    },
}

/// Coalescing cache in front of a [`DecryptBoundary`].
///
/// The lock is never held across an await.
pub struct DecryptionCache {
    boundary: Arc<dyn DecryptBoundary>,
    session: Mutex<Session>,
}

impl DecryptionCache {
    pub fn new(boundary: Arc<dyn DecryptBoundary>) -> Self {
        Self {
            boundary,
            session: Mutex::new(Session::default()),
        }
    }

    pub fn boundary(&self) -> &Arc<dyn DecryptBoundary> {
        &self.boundary
    }

    /// True when the `kind` dictionary holds entries decrypted under the
    /// key most recently requested.
    ///
    /// Mappings left over from a key that has since been superseded do not
    /// count.
    pub fn has_mapping(&self, kind: MappingKind) -> bool {
        let session = self.session.lock();
        match (&session.populated, &session.current) {
            (Some(populated), Some(current)) => {
                &populated.fingerprint == current && !populated.mappings.get(kind).is_empty()
            }
            _ => false,
        }
    }

    /// True when the cache holds mappings decrypted under `fingerprint`.
    pub fn has_mapping_for(&self, fingerprint: &KeyFingerprint) -> bool {
        self.mappings_for(fingerprint).is_some()
    }

    /// The cached mappings, whatever key they belong to.
    pub fn mappings(&self) -> Option<Arc<IdentityMappings>> {
        self.session
            .lock()
            .populated
            .as_ref()
            .map(|p| Arc::clone(&p.mappings))
    }

    /// The cached mappings if they were decrypted under `fingerprint`.
    pub fn mappings_for(&self, fingerprint: &KeyFingerprint) -> Option<Arc<IdentityMappings>> {
        self.session
            .lock()
            .populated
            .as_ref()
            .filter(|p| &p.fingerprint == fingerprint)
            .map(|p| Arc::clone(&p.mappings))
    }

    /// Token the next response must carry to be applied.
    pub fn current_token(&self) -> u64 {
        self.session.lock().token
    }

    pub fn is_in_flight(&self) -> bool {
        self.session
            .lock()
            .pending
            .as_ref()
            .is_some_and(Pending::is_live)
    }

    /// Drop the cached mappings and orphan any in-flight request.
    ///
    /// Callers waiting on the orphaned request resolve to
    /// [`DecryptOutcome::Discarded`].
    pub fn invalidate(&self) {
        let mut session = self.session.lock();
        session.token += 1;
        session.current = None;
        session.populated = None;
        session.pending = None;
        debug!(token = session.token, "decryption cache invalidated");
    }

    /// Mappings for `key`, decrypting them if the cache does not hold them.
    ///
    /// At most one request is outstanding at a time. A caller asking for the
    /// key already in flight shares that request's outcome; a caller asking
    /// for a different key supersedes it.
    pub async fn decrypt_all(&self, key: &MasterKey) -> Result<DecryptOutcome> {
        let fingerprint = key.fingerprint();
        loop {
            match self.begin(fingerprint) {
                Step::Ready(outcome) => return outcome,
                Step::Join(result) => {
                    if let Some(outcome) = wait_for(result).await {
                        return outcome;
                    }
                    debug!(%fingerprint, "in-flight decrypt abandoned, reissuing");
                }
                Step::Lead { token, result } => {
                    return self.lead(key, fingerprint, token, result).await;
                }
            }
        }
    }

    fn begin(&self, fingerprint: KeyFingerprint) -> Step {
        let mut session = self.session.lock();
        session.current = Some(fingerprint);

        if let Some(populated) = &session.populated {
            if populated.fingerprint == fingerprint {
                debug!(%fingerprint, "decrypt served from cache");
                return Step::Ready(Ok(DecryptOutcome::Cached(Arc::clone(&populated.mappings))));
            }
        }

        if let Some(pending) = &session.pending {
            if pending.is_live() && pending.fingerprint == fingerprint {
                debug!(%fingerprint, token = pending.token, "joining in-flight decrypt");
                return Step::Join(pending.result.clone());
            }
            if pending.is_live() {
                warn!(
                    superseded = %pending.fingerprint,
                    %fingerprint,
                    "superseding in-flight decrypt for a different key"
                );
            }
        }

        session.token += 1;
        let token = session.token;
        let (tx, rx) = watch::channel(None);
        session.pending = Some(Pending {
            token,
            fingerprint,
            result: rx,
        });
        Step::Lead { token, result: tx }
    }

    async fn lead(
        &self,
        key: &MasterKey,
        fingerprint: KeyFingerprint,
        token: u64,
        result: watch::Sender<Option<Shared>>,
    ) -> Shared {
        debug!(%fingerprint, token, "issuing decrypt-all");
        let response = self.boundary.decrypt_all(key).await;

        let outcome = {
            let mut session = self.session.lock();
            if session.pending.as_ref().map(|p| p.token) == Some(token) {
                session.pending = None;
            }

            if session.token != token {
                warn!(%fingerprint, token, current = session.token, "discarding stale decrypt response");
                Ok(DecryptOutcome::Discarded)
            } else {
                match response {
                    Ok(mappings) => {
                        let mappings = Arc::new(mappings);
                        info!(
                            %fingerprint,
                            participants = mappings.participants.len(),
                            items = mappings.items.len(),
                            "identity mappings decrypted"
                        );
                        session.populated = Some(Populated {
                            fingerprint,
                            mappings: Arc::clone(&mappings),
                        });
                        Ok(DecryptOutcome::Decrypted(mappings))
                    }
                    Err(e) => {
                        warn!(%fingerprint, error = %e, "decrypt-all failed");
                        Err(CacheError::from(e))
                    }
                }
            }
        };

        // Nobody may be waiting; that is fine.
        let _ = result.send(Some(outcome.clone()));
        outcome
    }
}

/// Wait for the leader's outcome. `None` if the leader vanished first.
async fn wait_for(mut result: watch::Receiver<Option<Shared>>) -> Option<Shared> {
    loop {
        let current = result.borrow_and_update().clone();
        if current.is_some() {
            return current;
        }
        if result.changed().await.is_err() {
            return result.borrow().clone();
        }
    }
}
