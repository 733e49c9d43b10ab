//! The remote decrypt service.
//!
//! The cryptography runs server-side. This module only describes the calls
//! the client makes; implementations may use HTTP, an RPC client, or the
//! in-memory service in [`memory`].

use async_trait::async_trait;
use brambler_core::{IdentityMappings, MappingKind, MasterKey};
use thiserror::Error;

/// Message used when the service fails without explaining why.
pub const GENERIC_FAILURE_MESSAGE: &str = "failed to decrypt identities";

/// Failure reported by the decrypt boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BoundaryError {
    /// Shown to the user as-is.
    pub message: String,
    /// Whether `message` came from the server.
    pub from_server: bool,
}

impl BoundaryError {
    /// An error carrying the server's own message.
    ///
    /// A blank server message falls back to the generic one.
    pub fn server(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self::generic();
        }
        Self {
            message,
            from_server: true,
        }
    }

    /// An error with no usable server message.
    pub fn generic() -> Self {
        Self {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
            from_server: false,
        }
    }
}

/// The decrypt service.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DecryptBoundary: Send + Sync {
    /// Decrypt every participant and item alias belonging to `key`.
    async fn decrypt_all(&self, key: &MasterKey) -> Result<IdentityMappings, BoundaryError>;

    /// Fetch the master key the owner registered with the service.
    async fn fetch_owner_master_key(&self) -> Result<String, BoundaryError>;

    /// Register `original` and return the alias the service assigned to it.
    async fn create_alias(&self, kind: MappingKind, original: &str)
        -> Result<String, BoundaryError>;
}

/// An in-memory decrypt service for testing.
///
/// Calls can be held open until released, which makes in-flight
/// interleavings deterministic.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::RwLock;
    use tokio::sync::Notify;

    #[derive(Default, Clone)]
    struct Dictionaries {
        participants: HashMap<String, String>,
        items: HashMap<String, String>,
    }

    /// In-memory decrypt service.
    ///
    /// Each accepted key owns its own pair of dictionaries. Unknown keys are
    /// rejected the way the real service rejects a wrong key.
    #[derive(Default)]
    pub struct MemoryBoundary {
        keys: RwLock<HashMap<String, Dictionaries>>,
        owner_key: RwLock<Option<String>>,
        outage: RwLock<Option<BoundaryError>>,
        held: AtomicBool,
        release: Notify,
        decrypt_calls: AtomicUsize,
        alias_calls: AtomicUsize,
    }

    impl MemoryBoundary {
        pub fn new() -> Self {
            Self::default()
        }

        /// Accept `key`, decrypting it to the given pairs.
        pub fn accept_key<P, I>(&self, key: &str, participants: P, items: I)
        where
            P: IntoIterator<Item = (&'static str, &'static str)>,
            I: IntoIterator<Item = (&'static str, &'static str)>,
        {
            let dictionaries = Dictionaries {
                participants: participants
                    .into_iter()
                    .map(|(a, o)| (a.to_string(), o.to_string()))
                    .collect(),
                items: items
                    .into_iter()
                    .map(|(a, o)| (a.to_string(), o.to_string()))
                    .collect(),
            };
            self.keys.write().insert(key.to_string(), dictionaries);
        }

        /// Key returned by `fetch_owner_master_key`.
        pub fn set_owner_key(&self, key: Option<&str>) {
            *self.owner_key.write() = key.map(String::from);
        }

        /// Fail every call with `error`, or recover with `None`.
        pub fn set_outage(&self, error: Option<BoundaryError>) {
            *self.outage.write() = error;
        }

        /// Hold `decrypt_all` calls open until [`release`](Self::release).
        pub fn hold(&self) {
            self.held.store(true, Ordering::SeqCst);
        }

        /// Let held and future calls complete.
        pub fn release(&self) {
            self.held.store(false, Ordering::SeqCst);
            self.release.notify_waiters();
        }

        /// Number of `decrypt_all` calls received, including held ones.
        pub fn decrypt_calls(&self) -> usize {
            self.decrypt_calls.load(Ordering::SeqCst)
        }

        pub fn alias_calls(&self) -> usize {
            self.alias_calls.load(Ordering::SeqCst)
        }

        /// Yield until at least `n` decrypt calls have arrived.
        pub async fn wait_for_calls(&self, n: usize) {
            while self.decrypt_calls() < n {
                tokio::task::yield_now().await;
            }
        }

        async fn wait_until_released(&self) {
            loop {
                let notified = self.release.notified();
                if !self.held.load(Ordering::SeqCst) {
                    return;
                }
                notified.await;
            }
        }

        fn check_outage(&self) -> Result<(), BoundaryError> {
            match self.outage.read().clone() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl DecryptBoundary for MemoryBoundary {
        async fn decrypt_all(&self, key: &MasterKey) -> Result<IdentityMappings, BoundaryError> {
            self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_until_released().await;
            self.check_outage()?;

            let keys = self.keys.read();
            let dictionaries = keys
                .get(key.expose())
                .ok_or_else(|| BoundaryError::server("Invalid master key"))?;
            Ok(IdentityMappings::new(
                dictionaries.participants.clone().into(),
                dictionaries.items.clone().into(),
            ))
        }

        async fn fetch_owner_master_key(&self) -> Result<String, BoundaryError> {
            self.check_outage()?;
            self.owner_key
                .read()
                .clone()
                .ok_or_else(|| BoundaryError::server("No master key registered"))
        }

        async fn create_alias(
            &self,
            kind: MappingKind,
            original: &str,
        ) -> Result<String, BoundaryError> {
            self.check_outage()?;
            let n = self.alias_calls.fetch_add(1, Ordering::SeqCst) + 1;
            let alias = format!("{kind}-{n}");

            for dictionaries in self.keys.write().values_mut() {
                let dictionary = match kind {
                    MappingKind::Participant => &mut dictionaries.participants,
                    MappingKind::Item => &mut dictionaries.items,
                };
                dictionary.insert(alias.clone(), original.to_string());
            }
            Ok(alias)
        }
    }
}
