//! The Brambler session: one owner's key, cache, and visibility.
//!
//! A session owns every piece of mutable state the subsystem has. Nothing is
//! global; tests build a fresh session per case.

use std::sync::Arc;

use brambler_cache::{CacheError, DecryptBoundary, DecryptionCache};
use brambler_core::{
    EntityId, IdentityMappings, KeyFingerprint, KeySource, MappingKind, MasterKey, Visibility,
    VisibilityState,
};
use brambler_perms::{GatedAction, OwnerGate, PrincipalSource};
use brambler_store::{
    ClearReport, CloudBackend, CloudKv, KeyBackend, KeyPersistence, SqliteBackend,
};
use parking_lot::RwLock;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::BramblerConfig;
use crate::error::{BramblerError, Result};

struct CurrentKey {
    key: MasterKey,
    source: KeySource,
}

/// A session-scoped Brambler instance.
///
/// Provides:
/// - Saving, loading, recovering and clearing the master key
/// - Global and per-entity reveal
/// - Display name resolution
/// - Alias creation and external change handling
///
/// Every mutating call checks the owner gate before touching any state.
/// Methods take `&self`, so concurrent reveals on one session coalesce into
/// a single decrypt-all.
pub struct Brambler {
    config: BramblerConfig,
    persistence: KeyPersistence,
    cache: DecryptionCache,
    gate: OwnerGate,
    current: RwLock<Option<CurrentKey>>,
    visibility: RwLock<VisibilityState>,
}

impl Brambler {
    /// Assemble a session from already-built parts.
    pub fn new(
        config: BramblerConfig,
        persistence: KeyPersistence,
        boundary: Arc<dyn DecryptBoundary>,
        principals: Arc<dyn PrincipalSource>,
    ) -> Self {
        Self {
            config,
            persistence,
            cache: DecryptionCache::new(boundary),
            gate: OwnerGate::new(principals),
            current: RwLock::new(None),
            visibility: RwLock::new(VisibilityState::new()),
        }
    }

    /// Build the standard chain from `config`: the cloud store behind its
    /// version gate, then SQLite on the device.
    pub fn open<C>(
        config: BramblerConfig,
        cloud: C,
        boundary: Arc<dyn DecryptBoundary>,
        principals: Arc<dyn PrincipalSource>,
    ) -> Result<Self>
    where
        C: CloudKv + 'static,
    {
        config.validate()?;

        let cloud: Arc<dyn KeyBackend> = Arc::new(CloudBackend::with_min_version(
            cloud,
            config.cloud_min_version()?,
        ));
        let local: Arc<dyn KeyBackend> = match &config.local_db_path {
            Some(path) => Arc::new(SqliteBackend::open(path)?),
            None => Arc::new(SqliteBackend::open_memory()?),
        };
        let persistence =
            KeyPersistence::cloud_then_local(config.storage_key.clone(), cloud, local);

        Ok(Self::new(config, persistence, boundary, principals))
    }

    pub fn config(&self) -> &BramblerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist `key` and make it the session key.
    ///
    /// Returns the backend that accepted it. A different key than the current
    /// one drops the cached mappings and resets visibility.
    pub async fn save_master_key(&self, key: &str) -> Result<KeySource> {
        self.gate.require(GatedAction::SaveKey)?;
        self.save_unchecked(key).await
    }

    /// Read the persisted key into the session.
    ///
    /// Mirrors storage: if no backend holds a record, the session ends up
    /// without a key.
    pub async fn load_master_key(&self) -> Result<Option<KeySource>> {
        self.gate.require(GatedAction::LoadKey)?;

        match self.persistence.load().await? {
            Some(record) => {
                let source = record.source;
                self.install(record.key, source);
                Ok(Some(source))
            }
            None => {
                if self.current.write().take().is_some() {
                    self.forget_derived_state();
                }
                Ok(None)
            }
        }
    }

    /// Session-start load.
    ///
    /// Non-owners start without a key instead of getting an error.
    pub async fn auto_load(&self) -> Result<Option<KeySource>> {
        if !self.gate.authorize(GatedAction::LoadKey) {
            debug!("skipping auto-load for non-owner");
            return Ok(None);
        }
        self.load_master_key().await
    }

    /// Forget the key everywhere.
    ///
    /// The session key, cache and visibility go first, so nothing can decrypt
    /// under the old key while storage is being cleared.
    pub async fn clear_master_key(&self) -> Result<ClearReport> {
        self.gate.require(GatedAction::ClearKey)?;

        self.current.write().take();
        self.forget_derived_state();

        let report = self.persistence.clear().await?;
        info!(cleared_from = ?report.cleared_from, "master key forgotten");
        Ok(report)
    }

    /// Fetch the owner's key from the decrypt service and save it.
    pub async fn recover_master_key(&self) -> Result<KeySource> {
        self.gate.require(GatedAction::RecoverKey)?;

        let raw = self
            .cache
            .boundary()
            .fetch_owner_master_key()
            .await
            .map_err(CacheError::from)?;
        let raw = Zeroizing::new(raw);
        self.save_unchecked(&raw).await
    }

    /// Provenance of the session key, `None` when no key is loaded.
    pub fn current_key_source(&self) -> Option<KeySource> {
        self.current.read().as_ref().map(|c| c.source)
    }

    pub fn has_key(&self) -> bool {
        self.current.read().is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Visibility Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Reveal every entity.
    ///
    /// Decrypts first if the cache is cold. On failure nothing changes. If
    /// the key changes while the decrypt is outstanding, the reveal is
    /// dropped and visibility stays as it was.
    pub async fn reveal_all(&self) -> Result<()> {
        self.gate.require(GatedAction::RevealAll)?;
        self.reveal_all_unchecked().await
    }

    /// Hide every entity. Never touches the network.
    pub fn hide_all(&self) -> Result<()> {
        self.gate.require(GatedAction::HideAll)?;
        self.visibility.write().hide_all();
        debug!("all identities hidden");
        Ok(())
    }

    /// Flip between REVEALED and HIDDEN, returning the new visibility.
    ///
    /// From PARTIAL this reveals.
    pub async fn toggle_global(&self) -> Result<Visibility> {
        self.gate.require(GatedAction::ToggleGlobal)?;

        if self.visibility.read().global_reveal() {
            self.visibility.write().hide_all();
        } else {
            self.reveal_all_unchecked().await?;
        }
        Ok(self.visibility())
    }

    /// Flip one entity's reveal override and return whether it is now shown.
    ///
    /// A no-op while REVEALED. A cold cache is filled first; concurrent
    /// toggles share that one decrypt-all.
    pub async fn toggle_entity(&self, id: &EntityId) -> Result<bool> {
        self.gate.require(GatedAction::ToggleEntity)?;

        if self.visibility.read().global_reveal() {
            return Ok(true);
        }

        let key = self.current_key()?;
        let fingerprint = key.fingerprint();
        if !self.cache.has_mapping_for(&fingerprint) && !self.decrypt(&key).await? {
            return Ok(self.is_revealed(id));
        }

        let shown = self.visibility.write().toggle_entity(id);
        debug!(entity = %id, shown, "entity override toggled");
        Ok(shown)
    }

    /// Whether `id` currently shows its original name.
    pub fn is_revealed(&self, id: &EntityId) -> bool {
        let has_mapping = self.mappings().is_some();
        self.visibility.read().is_revealed(id, has_mapping)
    }

    /// The name to show for `id`, whose public alias is `alias`.
    pub fn display_name(&self, id: &EntityId, alias: &str) -> String {
        let mappings = self.mappings();
        self.visibility
            .read()
            .display_name(id, alias, mappings.as_deref())
            .to_string()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.read().visibility()
    }

    /// Snapshot of the visibility state.
    pub fn visibility_state(&self) -> VisibilityState {
        self.visibility.read().clone()
    }

    /// Mappings decrypted under the session key, if any.
    pub fn mappings(&self) -> Option<Arc<IdentityMappings>> {
        let fingerprint = self.current_fingerprint()?;
        self.cache.mappings_for(&fingerprint)
    }

    /// Whether a decrypt-all is outstanding.
    pub fn is_decrypting(&self) -> bool {
        self.cache.is_in_flight()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // External Changes
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new alias for `original` with the decrypt service.
    ///
    /// The cached mappings predate the alias, so they are dropped and
    /// visibility resets.
    pub async fn create_alias(&self, kind: MappingKind, original: &str) -> Result<String> {
        self.gate.require(GatedAction::CreateAlias)?;

        let alias = self
            .cache
            .boundary()
            .create_alias(kind, original)
            .await
            .map_err(CacheError::from)?;
        self.forget_derived_state();
        info!(%kind, "alias created");
        Ok(alias)
    }

    /// The underlying data changed elsewhere. Cached mappings and any
    /// in-flight decrypt are dropped and visibility resets.
    pub fn handle_remote_change(&self) -> Result<()> {
        self.gate.require(GatedAction::RemoteChange)?;
        self.forget_derived_state();
        debug!("remote change applied");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn save_unchecked(&self, key: &str) -> Result<KeySource> {
        let record = self.persistence.save(key).await?;
        let source = record.source;
        self.install(record.key, source);
        Ok(source)
    }

    async fn reveal_all_unchecked(&self) -> Result<()> {
        let key = self.current_key()?;
        if !self.cache.has_mapping_for(&key.fingerprint()) && !self.decrypt(&key).await? {
            return Ok(());
        }
        self.visibility.write().reveal_all();
        debug!("all identities revealed");
        Ok(())
    }

    /// Fill the cache for `key`. `false` if the response went stale.
    async fn decrypt(&self, key: &MasterKey) -> Result<bool> {
        let outcome = self.cache.decrypt_all(key).await?;
        let fingerprint = key.fingerprint();
        if outcome.is_discarded() || self.current_fingerprint() != Some(fingerprint) {
            debug!(%fingerprint, "key changed during decrypt, leaving visibility alone");
            return Ok(false);
        }
        Ok(true)
    }

    /// Make `key` the session key, dropping derived state if it changed.
    fn install(&self, key: MasterKey, source: KeySource) {
        let mut current = self.current.write();
        let fingerprint = key.fingerprint();
        let changed = current.as_ref().map(|c| c.key.fingerprint()) != Some(fingerprint);
        if changed {
            self.forget_derived_state();
            info!(%fingerprint, %source, "session key changed");
        }
        *current = Some(CurrentKey { key, source });
    }

    fn forget_derived_state(&self) {
        self.cache.invalidate();
        self.visibility.write().reset();
    }

    fn current_key(&self) -> Result<MasterKey> {
        self.current
            .read()
            .as_ref()
            .map(|c| c.key.clone())
            .ok_or(BramblerError::NoMasterKey)
    }

    fn current_fingerprint(&self) -> Option<KeyFingerprint> {
        self.current.read().as_ref().map(|c| c.key.fingerprint())
    }
}
