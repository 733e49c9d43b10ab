//! # Brambler Core
//!
//! Pure types for the Brambler identity-anonymization subsystem: the master
//! key and its persisted record, alias→original identity mappings, and the
//! visibility state machine.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`MasterKey`] - The owner's secret, wiped from memory on drop
//! - [`MasterKeyRecord`] - The versioned record persisted by key backends
//! - [`KeyFingerprint`] - Non-secret identity of a key, safe to log
//! - [`IdentityMappings`] - Participant and item alias dictionaries
//! - [`VisibilityState`] - Global reveal flag plus per-entity overrides
//!
//! ## Display Resolution
//!
//! An entity shows its original name when global reveal is on, or when its
//! override is on and a mapping exists. Otherwise it shows the alias. See
//! [`VisibilityState::display_name`].

pub mod error;
pub mod key;
pub mod mapping;
pub mod types;
pub mod visibility;

pub use error::{CoreError, Result};
pub use key::{KeyFingerprint, MasterKey, MasterKeyRecord, RECORD_VERSION};
pub use mapping::{IdentityMapping, IdentityMappings};
pub use types::{EntityId, KeySource, MappingKind};
pub use visibility::{Visibility, VisibilityState};
