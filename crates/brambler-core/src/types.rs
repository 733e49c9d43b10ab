//! Strong type definitions for Brambler.
//!
//! Identifiers are newtypes so that a participant id can never be looked up
//! in the item dictionary by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend last served or stored the master key.
///
/// Used for user-facing provenance only; nothing branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeySource {
    /// Platform-provided, account-synced key-value store.
    Cloud,
    /// Device-local store. Always available as the terminal fallback.
    Local,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Cloud => write!(f, "CLOUD"),
            KeySource::Local => write!(f, "LOCAL"),
        }
    }
}

/// The two alias dictionaries produced by a bulk decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Participant,
    Item,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKind::Participant => write!(f, "participant"),
            MappingKind::Item => write!(f, "item"),
        }
    }
}

/// An anonymized entity whose real name can be revealed.
///
/// The kind selects which dictionary resolves the entity's alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: MappingKind,
    pub id: String,
}

impl EntityId {
    pub fn new(kind: MappingKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn participant(id: impl Into<String>) -> Self {
        Self::new(MappingKind::Participant, id)
    }

    pub fn item(id: impl Into<String>) -> Self {
        Self::new(MappingKind::Item, id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
