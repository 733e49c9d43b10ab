//! End-to-end scenarios through the public session API.
//!
//! Every test builds a fresh session over in-memory backends and an
//! in-memory decrypt service.

use std::sync::Arc;

use brambler::cache::boundary::memory::MemoryBoundary;
use brambler::cache::{BoundaryError, GENERIC_FAILURE_MESSAGE};
use brambler::core::MasterKeyRecord;
use brambler::perms::{GatedAction, StaticPrincipals};
use brambler::store::cloud::memory::MemoryCloudKv;
use brambler::{Brambler, BramblerConfig, BramblerError, EntityId, KeySource, MappingKind, Visibility};
use brambler_testkit::fixtures::{
    participant, participants, TestFixture, KEY_1, KEY_1_ITEMS, KEY_1_PARTICIPANTS, KEY_2, OWNER,
};
use brambler_testkit::generators::{blank_key, master_key};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn assert_denied<T: std::fmt::Debug>(result: brambler::Result<T>, expected: GatedAction) {
    match result {
        Err(BramblerError::PermissionDenied { action }) => assert_eq!(action, expected),
        other => panic!("expected PermissionDenied for {expected}, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Key Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_idempotent_save() {
    init_tracing();
    let fixture = TestFixture::new();
    let brambler = &fixture.brambler;

    let first = brambler.save_master_key(KEY_1).await.unwrap();
    let first_record = MasterKeyRecord::decode(&fixture.cloud_record().unwrap(), first)
        .unwrap()
        .unwrap();

    let second = brambler.save_master_key(KEY_1).await.unwrap();
    let second_record = MasterKeyRecord::decode(&fixture.cloud_record().unwrap(), second)
        .unwrap()
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first_record.key, second_record.key);
    assert_eq!(first_record.source, second_record.source);
    assert_eq!(brambler.load_master_key().await.unwrap(), Some(first));
}

#[tokio::test]
async fn test_fallback_determinism() {
    let fixture = TestFixture::new();
    fixture.cloud.set_supported(false);

    let source = fixture.brambler.save_master_key(KEY_1).await.unwrap();
    assert_eq!(source, KeySource::Local);
    assert!(fixture.cloud_record().is_none());

    let record = MasterKeyRecord::decode(&fixture.local_record().unwrap(), KeySource::Local)
        .unwrap()
        .unwrap();
    assert_eq!(record.key.expose(), KEY_1);
    assert_eq!(
        fixture.brambler.load_master_key().await.unwrap(),
        Some(KeySource::Local)
    );
    assert_eq!(fixture.brambler.current_key_source(), Some(KeySource::Local));
}

#[tokio::test]
async fn test_empty_key_save() {
    let fixture = TestFixture::new();

    for blank in ["", "   "] {
        assert!(matches!(
            fixture.brambler.save_master_key(blank).await,
            Err(BramblerError::EmptyKey)
        ));
    }
    assert_eq!(fixture.cloud.write_count(), 0);
    assert_eq!(fixture.local.write_count(), 0);
    assert!(!fixture.brambler.has_key());
}

#[tokio::test]
async fn test_total_persist_failure_keeps_previous_key() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let before = fixture.cloud_record();
    fixture.cloud.set_fail_writes(true);
    fixture.local.set_fail_writes(true);

    match fixture.brambler.save_master_key(KEY_2).await {
        Err(BramblerError::StoragePersistFailure { failures }) => assert_eq!(failures.len(), 2),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(fixture.cloud_record(), before);
    assert!(fixture.local_record().is_none());

    fixture.brambler.reveal_all().await.unwrap();
    assert_eq!(
        fixture.brambler.display_name(&participant(1), "Quiet Otter"),
        "Alice"
    );
}

#[tokio::test]
async fn test_clear_from_both() {
    let fixture = TestFixture::with_key(KEY_1).await;
    fixture.local.seed(&fixture.brambler.config().storage_key, KEY_2);

    let report = fixture.brambler.clear_master_key().await.unwrap();
    assert_eq!(report.cleared_from, vec![KeySource::Cloud, KeySource::Local]);
    assert!(!fixture.brambler.has_key());
    assert_eq!(fixture.brambler.load_master_key().await.unwrap(), None);
}

#[tokio::test]
async fn test_partial_clear_reports_progress_and_forgets_session_key() {
    let fixture = TestFixture::with_key(KEY_1).await;
    fixture.local.seed(&fixture.brambler.config().storage_key, KEY_1);
    fixture.cloud.set_fail_removes(true);

    match fixture.brambler.clear_master_key().await {
        Err(BramblerError::StorageClearFailure {
            cleared_from,
            failures,
        }) => {
            assert_eq!(cleared_from, vec![KeySource::Local]);
            assert_eq!(failures[0].backend, KeySource::Cloud);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!fixture.brambler.has_key());
    assert!(fixture.brambler.mappings().is_none());
}

#[tokio::test]
async fn test_clear_resets_visibility_and_cache() {
    let fixture = TestFixture::with_key(KEY_1).await;
    fixture.brambler.toggle_entity(&participant(1)).await.unwrap();
    assert_eq!(fixture.brambler.visibility(), Visibility::Partial);

    fixture.brambler.clear_master_key().await.unwrap();
    assert_eq!(fixture.brambler.visibility(), Visibility::Hidden);
    assert_eq!(fixture.brambler.visibility_state().override_count(), 0);
    assert!(fixture.brambler.mappings().is_none());
    assert!(matches!(
        fixture.brambler.reveal_all().await,
        Err(BramblerError::NoMasterKey)
    ));
}

#[tokio::test]
async fn test_auto_load_reads_legacy_local_record() {
    let fixture = TestFixture::new();
    fixture.local.seed(&fixture.brambler.config().storage_key, KEY_1);

    assert_eq!(
        fixture.brambler.auto_load().await.unwrap(),
        Some(KeySource::Local)
    );
    fixture.brambler.reveal_all().await.unwrap();
    assert_eq!(
        fixture.brambler.display_name(&participant(1), "Red Fox"),
        "Bob"
    );
}

#[tokio::test]
async fn test_auto_load_without_record_is_keyless() {
    let fixture = TestFixture::new();
    assert_eq!(fixture.brambler.auto_load().await.unwrap(), None);
    assert!(!fixture.brambler.has_key());
    assert_eq!(fixture.brambler.current_key_source(), None);
}

#[tokio::test]
async fn test_load_after_remote_clear_drops_session_key() {
    let fixture = TestFixture::with_key(KEY_1).await;
    fixture.brambler.reveal_all().await.unwrap();
    fixture.cloud.seed(&fixture.brambler.config().storage_key, "");

    assert_eq!(fixture.brambler.load_master_key().await.unwrap(), None);
    assert!(!fixture.brambler.has_key());
    assert_eq!(fixture.brambler.visibility(), Visibility::Hidden);
}

#[tokio::test]
async fn test_recover_master_key() {
    let fixture = TestFixture::new();

    let source = fixture.brambler.recover_master_key().await.unwrap();
    assert_eq!(source, KeySource::Cloud);
    let record = MasterKeyRecord::decode(&fixture.cloud_record().unwrap(), source)
        .unwrap()
        .unwrap();
    assert_eq!(record.key.expose(), KEY_1);

    fixture.brambler.reveal_all().await.unwrap();
    assert_eq!(
        fixture.brambler.display_name(&EntityId::item("1"), "Blue Crate"),
        "Tent"
    );
}

#[tokio::test]
async fn test_recover_surfaces_server_message() {
    let fixture = TestFixture::new();
    fixture.boundary.set_owner_key(None);

    match fixture.brambler.recover_master_key().await {
        Err(BramblerError::DecryptionFailure(message)) => {
            assert_eq!(message, "No master key registered")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!fixture.brambler.has_key());
    assert!(fixture.cloud_record().is_none());
}

#[tokio::test]
async fn test_sqlite_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = BramblerConfig {
        local_db_path: Some(dir.path().join("brambler.db")),
        ..BramblerConfig::default()
    };
    let boundary = Arc::new(MemoryBoundary::new());
    boundary.accept_key(KEY_1, KEY_1_PARTICIPANTS, KEY_1_ITEMS);
    let principals = Arc::new(StaticPrincipals::owner(OWNER));

    {
        let brambler = Brambler::open(
            config.clone(),
            MemoryCloudKv::new("6.0"),
            boundary.clone(),
            principals.clone(),
        )
        .unwrap();
        assert_eq!(
            brambler.save_master_key(KEY_1).await.unwrap(),
            KeySource::Local
        );
    }

    let brambler = Brambler::open(config, MemoryCloudKv::new("6.0"), boundary, principals).unwrap();
    assert_eq!(brambler.auto_load().await.unwrap(), Some(KeySource::Local));
    assert!(brambler.toggle_entity(&participant(3)).await.unwrap());
    assert_eq!(brambler.display_name(&participant(3), "Grey Heron"), "Carol");
}

// ─────────────────────────────────────────────────────────────────────────────
// Decryption Cache
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cache_reuse() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;

    brambler.reveal_all().await.unwrap();
    brambler.hide_all().unwrap();
    assert_eq!(fixture.boundary.decrypt_calls(), 1);

    for id in participants(10) {
        assert!(brambler.toggle_entity(&id).await.unwrap());
    }
    assert_eq!(fixture.boundary.decrypt_calls(), 1);
    assert_eq!(brambler.visibility_state().override_count(), 10);
    assert_eq!(brambler.visibility(), Visibility::Partial);
}

#[tokio::test]
async fn test_concurrent_toggles_coalesce() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    fixture.boundary.hold();

    let (first, second) = (participant(1), participant(2));
    let (a, b, _) = tokio::join!(
        brambler.toggle_entity(&first),
        brambler.toggle_entity(&second),
        async {
            fixture.boundary.wait_for_calls(1).await;
            assert!(brambler.is_decrypting());
            tokio::task::yield_now().await;
            fixture.boundary.release();
        }
    );

    assert!(a.unwrap());
    assert!(b.unwrap());
    assert_eq!(fixture.boundary.decrypt_calls(), 1);
    assert!(brambler.is_revealed(&first));
    assert!(brambler.is_revealed(&second));
    assert!(!brambler.is_decrypting());
}

#[tokio::test]
async fn test_stale_response_after_key_change_and_clear() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    fixture.boundary.hold();

    let (revealed, _) = tokio::join!(brambler.reveal_all(), async {
        fixture.boundary.wait_for_calls(1).await;
        brambler.save_master_key(KEY_2).await.unwrap();
        brambler.clear_master_key().await.unwrap();
        fixture.boundary.release();
    });

    revealed.unwrap();
    assert_eq!(brambler.visibility(), Visibility::Hidden);
    assert!(brambler.mappings().is_none());
    assert!(!brambler.has_key());
}

#[tokio::test]
async fn test_stale_response_never_lands_under_new_key() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    fixture.boundary.hold();

    let participant_1 = participant(1);
    let (toggled, _) = tokio::join!(brambler.toggle_entity(&participant_1), async {
        fixture.boundary.wait_for_calls(1).await;
        brambler.save_master_key(KEY_2).await.unwrap();
        fixture.boundary.release();
    });

    assert!(!toggled.unwrap());
    assert!(brambler.mappings().is_none());
    assert_eq!(brambler.visibility(), Visibility::Hidden);

    brambler.reveal_all().await.unwrap();
    assert_eq!(brambler.display_name(&participant(1), "Quiet Otter"), "Mallory");
    assert_eq!(fixture.boundary.decrypt_calls(), 2);
}

#[tokio::test]
async fn test_remote_change_discards_in_flight_decrypt() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    fixture.boundary.hold();

    let participant_1 = participant(1);
    let (toggled, _) = tokio::join!(brambler.toggle_entity(&participant_1), async {
        fixture.boundary.wait_for_calls(1).await;
        brambler.handle_remote_change().unwrap();
        fixture.boundary.release();
    });

    assert!(!toggled.unwrap());
    assert!(brambler.mappings().is_none());

    assert!(brambler.toggle_entity(&participant(1)).await.unwrap());
    assert_eq!(fixture.boundary.decrypt_calls(), 2);
}

#[tokio::test]
async fn test_decryption_failure_changes_nothing() {
    let fixture = TestFixture::with_key("not-a-registered-key").await;
    let before = fixture.observe();

    match fixture.brambler.reveal_all().await {
        Err(BramblerError::DecryptionFailure(message)) => {
            assert_eq!(message, "Invalid master key")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(fixture.brambler.toggle_entity(&participant(1)).await.is_err());

    let after = fixture.observe();
    assert_eq!(after.visibility, before.visibility);
    assert_eq!(after.mappings, None);
    assert_eq!(after.decrypt_calls, 2);
}

#[tokio::test]
async fn test_failed_decrypt_keeps_warm_cache() {
    let fixture = TestFixture::with_key(KEY_1).await;
    fixture.brambler.toggle_entity(&participant(1)).await.unwrap();
    fixture
        .boundary
        .set_outage(Some(BoundaryError::generic()));

    assert!(fixture.brambler.toggle_entity(&participant(2)).await.unwrap());
    assert_eq!(fixture.boundary.decrypt_calls(), 1);

    fixture.brambler.handle_remote_change().unwrap();
    match fixture.brambler.reveal_all().await {
        Err(BramblerError::DecryptionFailure(message)) => {
            assert_eq!(message, GENERIC_FAILURE_MESSAGE)
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(fixture.brambler.visibility(), Visibility::Hidden);
}

#[tokio::test]
async fn test_create_alias_invalidates_mappings() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    brambler.reveal_all().await.unwrap();

    let alias = brambler.create_alias(MappingKind::Item, "Axe").await.unwrap();
    assert_eq!(brambler.visibility(), Visibility::Hidden);
    assert!(brambler.mappings().is_none());

    let axe = EntityId::item("9");
    assert!(brambler.toggle_entity(&axe).await.unwrap());
    assert_eq!(brambler.display_name(&axe, &alias), "Axe");
    assert_eq!(fixture.boundary.decrypt_calls(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Visibility
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_visibility_reset_on_hide() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;

    brambler.toggle_entity(&participant(1)).await.unwrap();
    brambler.toggle_entity(&participant(2)).await.unwrap();
    assert_eq!(brambler.visibility_state().override_count(), 2);

    brambler.reveal_all().await.unwrap();
    brambler.hide_all().unwrap();

    assert_eq!(brambler.visibility_state().override_count(), 0);
    assert_eq!(brambler.visibility(), Visibility::Hidden);
    assert!(!brambler.is_revealed(&participant(1)));
}

#[tokio::test]
async fn test_toggle_off_removes_override_without_network() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    let otter = participant(1);

    assert!(brambler.toggle_entity(&otter).await.unwrap());
    assert!(!brambler.toggle_entity(&otter).await.unwrap());
    assert_eq!(brambler.visibility_state().override_count(), 0);
    assert_eq!(brambler.visibility(), Visibility::Hidden);
    assert_eq!(fixture.boundary.decrypt_calls(), 1);
}

#[tokio::test]
async fn test_toggle_entity_while_revealed_is_noop() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    brambler.reveal_all().await.unwrap();

    assert!(brambler.toggle_entity(&participant(1)).await.unwrap());
    assert_eq!(brambler.visibility(), Visibility::Revealed);
    assert_eq!(brambler.visibility_state().override_count(), 0);
}

#[tokio::test]
async fn test_toggle_global() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;

    brambler.toggle_entity(&participant(1)).await.unwrap();
    assert_eq!(brambler.toggle_global().await.unwrap(), Visibility::Revealed);
    assert_eq!(brambler.visibility_state().override_count(), 0);
    assert_eq!(brambler.toggle_global().await.unwrap(), Visibility::Hidden);
    assert_eq!(brambler.toggle_global().await.unwrap(), Visibility::Revealed);
    assert_eq!(fixture.boundary.decrypt_calls(), 1);
}

#[tokio::test]
async fn test_display_name_resolution() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    let otter = participant(1);
    let fox = participant(2);

    assert_eq!(brambler.display_name(&otter, "Quiet Otter"), "Quiet Otter");

    brambler.toggle_entity(&otter).await.unwrap();
    assert_eq!(brambler.display_name(&otter, "Quiet Otter"), "Alice");
    assert_eq!(brambler.display_name(&fox, "Red Fox"), "Red Fox");

    brambler.reveal_all().await.unwrap();
    assert_eq!(brambler.display_name(&fox, "Red Fox"), "Bob");
    assert_eq!(
        brambler.display_name(&participant(99), "Unknown Alias"),
        "Unknown Alias"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Owner Gate
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_owner_gating_has_no_side_effects() {
    let fixture = TestFixture::with_key(KEY_1).await;
    let brambler = &fixture.brambler;
    brambler.toggle_entity(&participant(1)).await.unwrap();
    let before = fixture.observe();

    fixture.act_as_stranger();
    assert_denied(brambler.save_master_key(KEY_2).await, GatedAction::SaveKey);
    assert_denied(brambler.save_master_key("").await, GatedAction::SaveKey);
    assert_denied(brambler.load_master_key().await, GatedAction::LoadKey);
    assert_denied(brambler.clear_master_key().await, GatedAction::ClearKey);
    assert_denied(brambler.recover_master_key().await, GatedAction::RecoverKey);
    assert_denied(brambler.reveal_all().await, GatedAction::RevealAll);
    assert_denied(brambler.hide_all(), GatedAction::HideAll);
    assert_denied(brambler.toggle_global().await, GatedAction::ToggleGlobal);
    assert_denied(
        brambler.toggle_entity(&participant(2)).await,
        GatedAction::ToggleEntity,
    );
    assert_denied(
        brambler.create_alias(MappingKind::Item, "Axe").await,
        GatedAction::CreateAlias,
    );
    assert_denied(brambler.handle_remote_change(), GatedAction::RemoteChange);
    assert_eq!(brambler.auto_load().await.unwrap(), None);

    assert_eq!(fixture.observe(), before);
    assert_eq!(fixture.boundary.alias_calls(), 0);

    fixture.act_as_owner();
    assert!(brambler.toggle_entity(&participant(2)).await.unwrap());
}

#[tokio::test]
async fn test_unknown_owner_is_denied() {
    let fixture = TestFixture::new();
    fixture.principals.set_owner(None);

    assert_denied(fixture.brambler.save_master_key(KEY_1).await, GatedAction::SaveKey);
    assert_eq!(fixture.cloud.write_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn save_then_load_returns_the_same_key(key in master_key()) {
        let stored = block_on(async {
            let fixture = TestFixture::new();
            let source = fixture.brambler.save_master_key(&key).await.unwrap();
            let reloaded = fixture.brambler.load_master_key().await.unwrap();
            assert_eq!(reloaded, Some(source));
            MasterKeyRecord::decode(&fixture.cloud_record().unwrap(), source)
                .unwrap()
                .unwrap()
        });
        prop_assert_eq!(stored.key.expose(), key.as_str());
    }

    #[test]
    fn blank_keys_are_never_written(key in blank_key()) {
        let fixture = block_on(async {
            let fixture = TestFixture::new();
            let result = fixture.brambler.save_master_key(&key).await;
            assert!(matches!(result, Err(BramblerError::EmptyKey)));
            fixture
        });
        prop_assert_eq!(fixture.cloud.write_count(), 0);
        prop_assert_eq!(fixture.local.write_count(), 0);
    }
}
