//! Visibility state: global reveal plus per-entity overrides.
//!
//! ```text
//!            reveal_all                 hide_all
//!   HIDDEN ─────────────► REVEALED ─────────────► HIDDEN
//!     │  ▲                    ▲
//!     │  │ toggle (last off)  │ reveal_all
//!     ▼  │                    │
//!   PARTIAL ──────────────────┘
//! ```
//!
//! Overrides are only consulted while global reveal is off. Entering or
//! leaving REVEALED drops every override.

use std::collections::HashSet;

use crate::mapping::IdentityMappings;
use crate::types::EntityId;

/// Coarse visibility derived from [`VisibilityState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Global reveal off, no overrides.
    Hidden,
    /// Global reveal off, at least one entity overridden.
    Partial,
    /// Every entity revealed.
    Revealed,
}

/// Session-local visibility. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityState {
    global_reveal: bool,
    /// Entities whose override is on. Turning an override off removes the
    /// entry, so the set only ever holds overridden entities.
    overrides: HashSet<EntityId>,
}

impl VisibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility(&self) -> Visibility {
        if self.global_reveal {
            Visibility::Revealed
        } else if self.overrides.is_empty() {
            Visibility::Hidden
        } else {
            Visibility::Partial
        }
    }

    pub fn global_reveal(&self) -> bool {
        self.global_reveal
    }

    pub fn has_override(&self, id: &EntityId) -> bool {
        self.overrides.contains(id)
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Switch to REVEALED, dropping overrides.
    pub fn reveal_all(&mut self) {
        self.global_reveal = true;
        self.overrides.clear();
    }

    /// Switch to HIDDEN, dropping overrides.
    pub fn hide_all(&mut self) {
        self.global_reveal = false;
        self.overrides.clear();
    }

    /// Flip one entity's override and return its new state.
    ///
    /// No-op while REVEALED; returns `true` since the entity is shown anyway.
    pub fn toggle_entity(&mut self, id: &EntityId) -> bool {
        if self.global_reveal {
            return true;
        }
        if self.overrides.remove(id) {
            false
        } else {
            self.overrides.insert(id.clone());
            true
        }
    }

    /// Back to the session-start state.
    pub fn reset(&mut self) {
        self.hide_all();
    }

    /// Whether `id` should show its original name.
    ///
    /// `has_mapping` tells whether decrypted mappings exist for the current
    /// key; an override without a mapping has nothing to show.
    pub fn is_revealed(&self, id: &EntityId, has_mapping: bool) -> bool {
        self.global_reveal || (has_mapping && self.overrides.contains(id))
    }

    /// Resolve the name to display for `id`, whose public alias is `alias`.
    ///
    /// Falls back to the alias whenever the entity is not revealed or the
    /// mapping has no entry for it.
    pub fn display_name<'a>(
        &self,
        id: &EntityId,
        alias: &'a str,
        mappings: Option<&'a IdentityMappings>,
    ) -> &'a str {
        if !self.is_revealed(id, mappings.is_some()) {
            return alias;
        }
        mappings
            .and_then(|m| m.original(id.kind, alias))
            .unwrap_or(alias)
    }
}
