//! The owner gate.
//!
//! Authorization here is a single equality check, but it runs before every
//! mutating entry point, so a denied call has no side effects at all.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PermsError, Result};

/// Opaque identity of a user or session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-supplied identities the gate compares.
///
/// Either side may be unknown (signed out, data not yet loaded). An unknown
/// identity never matches.
pub trait PrincipalSource: Send + Sync {
    /// The principal performing the operation.
    fn current_principal(&self) -> Option<PrincipalId>;

    /// The principal owning the affected data scope.
    fn resource_owner(&self) -> Option<PrincipalId>;
}

/// Operations that must pass the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedAction {
    SaveKey,
    LoadKey,
    ClearKey,
    RecoverKey,
    RevealAll,
    HideAll,
    ToggleGlobal,
    ToggleEntity,
    CreateAlias,
    RemoteChange,
}

impl GatedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatedAction::SaveKey => "save_key",
            GatedAction::LoadKey => "load_key",
            GatedAction::ClearKey => "clear_key",
            GatedAction::RecoverKey => "recover_key",
            GatedAction::RevealAll => "reveal_all",
            GatedAction::HideAll => "hide_all",
            GatedAction::ToggleGlobal => "toggle_global",
            GatedAction::ToggleEntity => "toggle_entity",
            GatedAction::CreateAlias => "create_alias",
            GatedAction::RemoteChange => "remote_change",
        }
    }
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grants an action only to the owner of the affected data.
#[derive(Clone)]
pub struct OwnerGate {
    principals: Arc<dyn PrincipalSource>,
}

impl OwnerGate {
    pub fn new(principals: Arc<dyn PrincipalSource>) -> Self {
        Self { principals }
    }

    /// True only when the acting principal is known and owns the data.
    pub fn authorize(&self, action: GatedAction) -> bool {
        let current = self.principals.current_principal();
        let owner = self.principals.resource_owner();

        let allowed = matches!((&current, &owner), (Some(c), Some(o)) if c == o);
        if !allowed {
            debug!(
                %action,
                current = ?current.as_ref().map(PrincipalId::as_str),
                owner = ?owner.as_ref().map(PrincipalId::as_str),
                "owner gate denied"
            );
        }
        allowed
    }

    /// [`authorize`](Self::authorize) as a `Result`, for use with `?`.
    pub fn require(&self, action: GatedAction) -> Result<()> {
        if self.authorize(action) {
            Ok(())
        } else {
            Err(PermsError::PermissionDenied { action })
        }
    }
}

impl fmt::Debug for OwnerGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerGate").finish_non_exhaustive()
    }
}

/// A [`PrincipalSource`] holding both identities in memory.
///
/// Suitable for hosts that learn the identities once per session, and for
/// tests that switch principals mid-scenario.
#[derive(Debug, Default)]
pub struct StaticPrincipals {
    current: RwLock<Option<PrincipalId>>,
    owner: RwLock<Option<PrincipalId>>,
}

impl StaticPrincipals {
    pub fn new(current: Option<PrincipalId>, owner: Option<PrincipalId>) -> Self {
        Self {
            current: RwLock::new(current),
            owner: RwLock::new(owner),
        }
    }

    /// Both identities set to `id`.
    pub fn owner(id: impl Into<String>) -> Self {
        let id = PrincipalId::new(id);
        Self::new(Some(id.clone()), Some(id))
    }

    pub fn set_current(&self, current: Option<PrincipalId>) {
        *self.current.write() = current;
    }

    pub fn set_owner(&self, owner: Option<PrincipalId>) {
        *self.owner.write() = owner;
    }
}

impl PrincipalSource for StaticPrincipals {
    fn current_principal(&self) -> Option<PrincipalId> {
        self.current.read().clone()
    }

    fn resource_owner(&self) -> Option<PrincipalId> {
        self.owner.read().clone()
    }
}
