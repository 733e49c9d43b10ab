//! # Brambler Permissions
//!
//! Owner gating for every operation that touches the master key or
//! secret-derived state.
//!
//! ## Overview
//!
//! The gate compares two externally supplied identities: the principal
//! performing the operation and the principal owning the affected data.
//! Only the owner may save, load, clear or recover the key, reveal names,
//! or mint aliases. Everyone else gets `PermissionDenied` before any state
//! is touched.
//!
//! ## Key Types
//!
//! - [`PrincipalSource`] - Host-provided view of "who is acting" and "who owns this"
//! - [`OwnerGate`] - The per-action authorization check
//! - [`GatedAction`] - Every operation the gate is consulted for
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use brambler_perms::{GatedAction, OwnerGate, PrincipalId, StaticPrincipals};
//!
//! let principals = Arc::new(StaticPrincipals::new(
//!     Some(PrincipalId::new("user-1")),
//!     Some(PrincipalId::new("user-1")),
//! ));
//! let gate = OwnerGate::new(principals.clone());
//! assert!(gate.authorize(GatedAction::RevealAll));
//!
//! principals.set_current(Some(PrincipalId::new("user-2")));
//! assert!(gate.require(GatedAction::RevealAll).is_err());
//! ```

pub mod error;
pub mod gate;

pub use error::{PermsError, Result};
pub use gate::{GatedAction, OwnerGate, PrincipalId, PrincipalSource, StaticPrincipals};
