//! Session configuration.

use std::path::PathBuf;

use brambler_store::PlatformVersion;
use serde::{Deserialize, Serialize};

use crate::error::{BramblerError, Result};

/// Item key the master key record is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "brambler_master_key";

/// Oldest platform version exposing the cloud-synced store.
pub const DEFAULT_CLOUD_MIN_PLATFORM_VERSION: &str = "6.9";

/// Configuration for a [`Brambler`](crate::Brambler) session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BramblerConfig {
    /// Item key used in every backend.
    pub storage_key: String,
    /// Minimum `major.minor[.patch]` platform version for cloud storage.
    pub cloud_min_platform_version: String,
    /// SQLite file for the device-local backend. In-memory when absent.
    pub local_db_path: Option<PathBuf>,
}

impl Default for BramblerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            cloud_min_platform_version: DEFAULT_CLOUD_MIN_PLATFORM_VERSION.to_string(),
            local_db_path: None,
        }
    }
}

impl BramblerConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| BramblerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(BramblerError::Config("storage_key is empty".to_string()));
        }
        self.cloud_min_version()?;
        Ok(())
    }

    pub fn cloud_min_version(&self) -> Result<PlatformVersion> {
        self.cloud_min_platform_version
            .parse()
            .map_err(BramblerError::Config)
    }
}
