//! Cloud-synced backend.
//!
//! The platform exposes an account-synced key-value store through a
//! [`CloudKv`] client. The capability is gated on the platform version: below
//! the configured minimum the backend reports itself unsupported and the
//! fallback chain skips it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use brambler_core::KeySource;
use thiserror::Error;

use crate::error::{Result, StoreError};
use crate::traits::KeyBackend;

/// Error reported by the platform's cloud store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CloudKvError(pub String);

/// The platform's account-synced key-value client.
#[async_trait]
pub trait CloudKv: Send + Sync {
    /// Platform version string such as `"6.9"` or `"7.10.1"`, if reported.
    fn platform_version(&self) -> Option<String>;

    async fn get_item(&self, key: &str) -> std::result::Result<Option<String>, CloudKvError>;

    async fn set_item(&self, key: &str, value: &str) -> std::result::Result<(), CloudKvError>;

    /// Returns `true` if a value was present.
    async fn remove_item(&self, key: &str) -> std::result::Result<bool, CloudKvError>;
}

/// A `major.minor[.patch]` platform version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PlatformVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Ord for PlatformVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for PlatformVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for PlatformVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> std::result::Result<u32, String> {
            match parts.next() {
                Some(p) => p
                    .parse::<u32>()
                    .map_err(|e| format!("invalid version component {p:?}: {e}")),
                None if required => Err(format!("invalid version {s:?}")),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(true)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(format!("invalid version {s:?}: too many components"));
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version-gated [`KeyBackend`] over a [`CloudKv`] client.
pub struct CloudBackend<C: CloudKv> {
    client: C,
    min_version: PlatformVersion,
}

impl<C: CloudKv> CloudBackend<C> {
    /// Minimum platform version exposing cloud storage by default.
    pub const DEFAULT_MIN_VERSION: PlatformVersion = PlatformVersion::new(6, 9, 0);

    pub fn new(client: C) -> Self {
        Self::with_min_version(client, Self::DEFAULT_MIN_VERSION)
    }

    pub fn with_min_version(client: C, min_version: PlatformVersion) -> Self {
        Self {
            client,
            min_version,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn supported(&self) -> bool {
        let Some(raw) = self.client.platform_version() else {
            return false;
        };
        match raw.parse::<PlatformVersion>() {
            Ok(version) => version >= self.min_version,
            Err(e) => {
                tracing::debug!(version = %raw, error = %e, "unparseable platform version");
                false
            }
        }
    }

    fn ensure_supported(&self) -> Result<()> {
        if self.supported() {
            Ok(())
        } else {
            Err(StoreError::Unsupported(KeySource::Cloud))
        }
    }
}

fn backend_error(e: CloudKvError) -> StoreError {
    StoreError::Backend {
        backend: KeySource::Cloud,
        message: e.0,
    }
}

#[async_trait]
impl<C: CloudKv> KeyBackend for CloudBackend<C> {
    fn source(&self) -> KeySource {
        KeySource::Cloud
    }

    async fn is_supported(&self) -> bool {
        self.supported()
    }

    async fn get(&self, item: &str) -> Result<Option<String>> {
        self.ensure_supported()?;
        self.client.get_item(item).await.map_err(backend_error)
    }

    async fn set(&self, item: &str, value: &str) -> Result<()> {
        self.ensure_supported()?;
        self.client.set_item(item, value).await.map_err(backend_error)
    }

    async fn remove(&self, item: &str) -> Result<bool> {
        self.ensure_supported()?;
        self.client.remove_item(item).await.map_err(backend_error)
    }
}

/// A simple in-memory cloud client for testing.
pub mod memory {
    use super::*;
    use std::collections::HashMap;

    use parking_lot::RwLock;

    /// In-memory [`CloudKv`] reporting a fixed platform version.
    pub struct MemoryCloudKv {
        version: RwLock<Option<String>>,
        items: RwLock<HashMap<String, String>>,
        fail_writes: RwLock<Option<String>>,
    }

    impl MemoryCloudKv {
        pub fn new(version: impl Into<String>) -> Self {
            Self {
                version: RwLock::new(Some(version.into())),
                items: RwLock::new(HashMap::new()),
                fail_writes: RwLock::new(None),
            }
        }

        /// A client on a platform that reports no version at all.
        pub fn unversioned() -> Self {
            let kv = Self::new("");
            *kv.version.write() = None;
            kv
        }

        pub fn set_version(&self, version: Option<&str>) {
            *self.version.write() = version.map(String::from);
        }

        /// Make writes fail with `message`, or succeed again with `None`.
        pub fn fail_writes_with(&self, message: Option<&str>) {
            *self.fail_writes.write() = message.map(String::from);
        }

        pub fn peek(&self, key: &str) -> Option<String> {
            self.items.read().get(key).cloned()
        }
    }

    #[async_trait]
    impl CloudKv for MemoryCloudKv {
        fn platform_version(&self) -> Option<String> {
            self.version.read().clone()
        }

        async fn get_item(&self, key: &str) -> std::result::Result<Option<String>, CloudKvError> {
            Ok(self.items.read().get(key).cloned())
        }

        async fn set_item(&self, key: &str, value: &str) -> std::result::Result<(), CloudKvError> {
            if let Some(message) = self.fail_writes.read().clone() {
                return Err(CloudKvError(message));
            }
            self.items.write().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove_item(&self, key: &str) -> std::result::Result<bool, CloudKvError> {
            if let Some(message) = self.fail_writes.read().clone() {
                return Err(CloudKvError(message));
            }
            Ok(self.items.write().remove(key).is_some())
        }
    }
}
