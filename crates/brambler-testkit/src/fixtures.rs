//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use brambler::{Brambler, BramblerConfig};
use brambler_cache::boundary::memory::MemoryBoundary;
use brambler_core::{EntityId, IdentityMappings, KeySource, VisibilityState};
use brambler_perms::{PrincipalId, StaticPrincipals};
use brambler_store::{KeyPersistence, MemoryBackend};

/// Principal owning the fixture's data.
pub const OWNER: &str = "owner-1";

/// Principal who owns nothing.
pub const STRANGER: &str = "stranger-1";

/// A key the fixture's decrypt service accepts.
pub const KEY_1: &str = "owner-key-1";

/// A second accepted key with different mappings.
pub const KEY_2: &str = "owner-key-2";

/// Participant aliases decrypted under [`KEY_1`].
pub const KEY_1_PARTICIPANTS: [(&str, &str); 10] = [
    ("Quiet Otter", "Alice"),
    ("Red Fox", "Bob"),
    ("Grey Heron", "Carol"),
    ("Swift Hare", "Dave"),
    ("Old Badger", "Erin"),
    ("Tall Pine", "Frank"),
    ("Still Pond", "Grace"),
    ("Wild Thyme", "Heidi"),
    ("Bright Finch", "Ivan"),
    ("Dark Moss", "Judy"),
];

/// Item aliases decrypted under [`KEY_1`].
pub const KEY_1_ITEMS: [(&str, &str); 2] = [("Blue Crate", "Tent"), ("Green Sack", "Stove")];

/// Participant aliases decrypted under [`KEY_2`].
pub const KEY_2_PARTICIPANTS: [(&str, &str); 1] = [("Quiet Otter", "Mallory")];

/// A session over in-memory backends and an in-memory decrypt service.
pub struct TestFixture {
    pub cloud: Arc<MemoryBackend>,
    pub local: Arc<MemoryBackend>,
    pub boundary: Arc<MemoryBoundary>,
    pub principals: Arc<StaticPrincipals>,
    pub brambler: Brambler,
}

impl TestFixture {
    /// Create a fixture acting as the owner, with no key loaded.
    pub fn new() -> Self {
        let config = BramblerConfig::default();
        let cloud = Arc::new(MemoryBackend::new(KeySource::Cloud));
        let local = Arc::new(MemoryBackend::new(KeySource::Local));
        let persistence =
            KeyPersistence::cloud_then_local(config.storage_key.clone(), cloud.clone(), local.clone());

        let boundary = Arc::new(MemoryBoundary::new());
        boundary.accept_key(KEY_1, KEY_1_PARTICIPANTS, KEY_1_ITEMS);
        boundary.accept_key(KEY_2, KEY_2_PARTICIPANTS, []);
        boundary.set_owner_key(Some(KEY_1));

        let principals = Arc::new(StaticPrincipals::owner(OWNER));
        let brambler = Brambler::new(config, persistence, boundary.clone(), principals.clone());

        Self {
            cloud,
            local,
            boundary,
            principals,
            brambler,
        }
    }

    /// Create a fixture whose owner has already saved `key`.
    pub async fn with_key(key: &str) -> Self {
        let fixture = Self::new();
        fixture
            .brambler
            .save_master_key(key)
            .await
            .expect("fixture key should save");
        fixture
    }

    /// Act as a principal who does not own the data.
    pub fn act_as_stranger(&self) {
        self.principals
            .set_current(Some(PrincipalId::new(STRANGER)));
    }

    pub fn act_as_owner(&self) {
        self.principals.set_current(Some(PrincipalId::new(OWNER)));
    }

    /// Raw record stored in the cloud backend.
    pub fn cloud_record(&self) -> Option<String> {
        self.cloud.peek(self.brambler.config().storage_key.as_str())
    }

    /// Raw record stored in the local backend.
    pub fn local_record(&self) -> Option<String> {
        self.local.peek(self.brambler.config().storage_key.as_str())
    }

    /// Everything a gated operation could mutate.
    pub fn observe(&self) -> Observed {
        Observed {
            cloud: self.cloud_record(),
            local: self.local_record(),
            key_source: self.brambler.current_key_source(),
            visibility: self.brambler.visibility_state(),
            mappings: self.brambler.mappings(),
            decrypt_calls: self.boundary.decrypt_calls(),
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a fixture's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed {
    pub cloud: Option<String>,
    pub local: Option<String>,
    pub key_source: Option<KeySource>,
    pub visibility: VisibilityState,
    pub mappings: Option<Arc<IdentityMappings>>,
    pub decrypt_calls: usize,
}

/// The `n`th participant id.
pub fn participant(n: usize) -> EntityId {
    EntityId::participant(n.to_string())
}

/// `count` distinct participant ids.
pub fn participants(count: usize) -> Vec<EntityId> {
    (0..count).map(participant).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_starts_keyless_as_owner() {
        let fixture = TestFixture::new();
        let observed = fixture.observe();
        assert_eq!(observed.key_source, None);
        assert_eq!(observed.cloud, None);
        assert_eq!(observed.decrypt_calls, 0);
    }

    #[tokio::test]
    async fn test_with_key_saves_to_cloud() {
        let fixture = TestFixture::with_key(KEY_1).await;
        assert_eq!(fixture.brambler.current_key_source(), Some(KeySource::Cloud));
        assert!(fixture.cloud_record().is_some());
        assert!(fixture.local_record().is_none());
    }

    #[test]
    fn test_participant_ids_are_distinct() {
        let ids = participants(10);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 10);
    }
}
