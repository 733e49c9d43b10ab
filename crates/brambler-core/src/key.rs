//! The master key and its persisted record.
//!
//! Records are stored as small JSON objects:
//!
//! ```text
//! {"key":"...","source":"CLOUD","saved_at":1700000000000,"version":1}
//! ```
//!
//! Clients that predate versioned records stored the bare key string. Such
//! values decode as version 0 and are rewritten in the current format on the
//! next save.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};
use crate::types::KeySource;

/// Current schema version of [`MasterKeyRecord`].
pub const RECORD_VERSION: u32 = 1;

/// Version assigned to bare-string records written before versioning.
const LEGACY_VERSION: u32 = 0;

/// The owner's master key.
///
/// Never empty. The backing buffer is zeroed on drop and `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey(Zeroizing<String>);

impl MasterKey {
    /// Wrap a raw key, rejecting keys that are blank after trimming.
    ///
    /// The key is kept exactly as given; surrounding whitespace is not
    /// stripped.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = Zeroizing::new(raw.into());
        if raw.trim().is_empty() {
            return Err(CoreError::EmptyKey);
        }
        Ok(Self(raw))
    }

    /// Borrow the secret.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Non-secret identity of this key.
    pub fn fingerprint(&self) -> KeyFingerprint {
        KeyFingerprint::of(self.expose())
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey({})", self.fingerprint())
    }
}

/// Blake3 digest identifying a master key without revealing it.
///
/// Mappings are tagged with the fingerprint of the key they were decrypted
/// under, so a cache can never answer for a different key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyFingerprint(pub [u8; 32]);

impl KeyFingerprint {
    pub fn of(key: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"brambler-key-v1:");
        hasher.update(key.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// A persisted master key.
///
/// A record always holds a non-empty key; "no key" is `Option::None` at the
/// call site, never a record with an empty key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyRecord {
    pub key: MasterKey,
    /// Backend the record was last read from or written to.
    pub source: KeySource,
    /// Unix milliseconds. Zero for legacy records.
    pub saved_at: i64,
    pub version: u32,
}

#[derive(Serialize)]
struct RecordOut<'a> {
    key: &'a str,
    source: KeySource,
    saved_at: i64,
    version: u32,
}

#[derive(Deserialize)]
struct RecordIn {
    key: String,
    #[serde(default)]
    saved_at: i64,
    version: u32,
}

impl MasterKeyRecord {
    /// Build a fresh record in the current schema.
    pub fn new(key: MasterKey, source: KeySource, saved_at: i64) -> Self {
        Self {
            key,
            source,
            saved_at,
            version: RECORD_VERSION,
        }
    }

    /// Encode for a string-valued key-value backend.
    pub fn to_json(&self) -> Result<Zeroizing<String>> {
        let out = RecordOut {
            key: self.key.expose(),
            source: self.source,
            saved_at: self.saved_at,
            version: self.version,
        };
        serde_json::to_string(&out)
            .map(Zeroizing::new)
            .map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Decode a value read from a backend.
    ///
    /// `served_by` becomes the record's source: provenance reflects where the
    /// key was actually read, not where it was first written.
    ///
    /// Returns `Ok(None)` for blank values and for records holding a blank
    /// key. Records from a newer schema are an error so that the caller can
    /// fall back to another backend.
    pub fn decode(raw: &str, served_by: KeySource) -> Result<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if !trimmed.starts_with('{') {
            return Self::legacy(raw, served_by).map(Some);
        }

        let parsed: RecordIn = match serde_json::from_str(trimmed) {
            Ok(parsed) => parsed,
            Err(_) if !declares_version(trimmed) => {
                return Self::legacy(raw, served_by).map(Some);
            }
            Err(e) => return Err(CoreError::MalformedRecord(e.to_string())),
        };
        let RecordIn {
            key,
            saved_at,
            version,
        } = parsed;
        let key = Zeroizing::new(key);

        if version > RECORD_VERSION {
            return Err(CoreError::UnsupportedRecordVersion {
                found: version,
                supported: RECORD_VERSION,
            });
        }

        match MasterKey::new(key.as_str()) {
            Ok(key) => Ok(Some(Self {
                key,
                source: served_by,
                saved_at,
                version,
            })),
            Err(CoreError::EmptyKey) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn legacy(raw: &str, served_by: KeySource) -> Result<Self> {
        Ok(Self {
            key: MasterKey::new(raw)?,
            source: served_by,
            saved_at: 0,
            version: LEGACY_VERSION,
        })
    }

    /// Whether this record predates versioned storage.
    pub fn is_legacy(&self) -> bool {
        self.version == LEGACY_VERSION
    }
}

/// True when `raw` is a JSON object carrying a `version` field.
///
/// A brace-prefixed value without one is a bare legacy key.
fn declares_version(raw: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(|value| value.get("version").is_some())
        .unwrap_or(false)
}
