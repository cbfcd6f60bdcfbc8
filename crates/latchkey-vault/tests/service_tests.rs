// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the caller-facing vault contract over SQLite.

use std::sync::Arc;
use std::time::Duration;

use latchkey_config::model::{LatchkeyConfig, StorageConfig};
use latchkey_core::{EncryptedRecord, LatchkeyError, ManualClock, VaultStore};
use latchkey_security::ZxcvbnEstimator;
use latchkey_storage::SqliteStore;
use latchkey_vault::{crypto, ItemView, MasterKey, VaultService, LOCAL_CALLER};
use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;
use tracing_test::traced_test;

const PASSWORD: &str = "Gx7#mQv2!pLr9zTb";
const NEW_PASSWORD: &str = "correct-horse-battery-staple-9";

struct Harness {
    service: Arc<VaultService>,
    store: Arc<SqliteStore>,
    clock: Arc<ManualClock>,
    _dir: TempDir,
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LatchkeyConfig::default();
    config.kdf.n = 1 << 10;
    config.backoff.base_delay_ms = 1;
    config.backoff.max_delay_ms = 8;
    config.storage = StorageConfig {
        database_path: dir.path().join("vault.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };

    let store = Arc::new(SqliteStore::open(&config.storage).await.unwrap());
    let clock = Arc::new(ManualClock::new());
    let service = Arc::new(VaultService::new(
        &config,
        store.clone(),
        Arc::new(ZxcvbnEstimator::new()),
        clock.clone(),
    ));
    Harness {
        service,
        store,
        clock,
        _dir: dir,
    }
}

async fn initialized() -> Harness {
    let h = harness().await;
    h.service.initialize(&secret(PASSWORD)).await.unwrap();
    h
}

async fn snapshot(store: &SqliteStore) -> (Vec<EncryptedRecord>, latchkey_core::VaultMetadata) {
    let mut records = store.list_records().await.unwrap();
    records.sort_by(|a, b| a.id.cmp(&b.id));
    (records, store.get_metadata().await.unwrap().unwrap())
}

// --- Lifecycle ---

#[tokio::test]
async fn status_tracks_initialization() {
    let h = harness().await;
    assert!(!h.service.status().await.unwrap().initialized);
    h.service.initialize(&secret(PASSWORD)).await.unwrap();
    assert!(h.service.status().await.unwrap().initialized);

    let meta = h.store.get_metadata().await.unwrap().unwrap();
    assert_eq!(meta.salt.len(), 16);
    assert_eq!(meta.kdf.n, 1024);
    assert!(meta.verify_blob.starts_with("v1:"));
    assert!(meta.last_rotated_at.is_none());
}

#[tokio::test]
async fn initialize_twice_is_rejected() {
    let h = initialized().await;
    let err = h.service.initialize(&secret(NEW_PASSWORD)).await.unwrap_err();
    assert!(matches!(err, LatchkeyError::AlreadyInitialized));
}

#[tokio::test]
async fn weak_password_is_rejected_with_feedback() {
    let h = harness().await;
    let err = h.service.initialize(&secret("abc")).await.unwrap_err();
    match err {
        LatchkeyError::WeakPassword {
            score, suggestions, ..
        } => {
            assert!(score < 3);
            assert!(!suggestions.is_empty());
        }
        other => panic!("expected WeakPassword, got {other:?}"),
    }
    assert!(!h.service.status().await.unwrap().initialized);
}

#[tokio::test]
async fn unlock_before_initialize_is_not_initialized() {
    let h = harness().await;
    let err = h.service.unlock(&secret(PASSWORD)).await.unwrap_err();
    assert!(matches!(err, LatchkeyError::NotInitialized));
}

// --- Unlock, backoff, rate limiting ---

#[tokio::test]
async fn wrong_password_is_invalid_credentials_and_counts_a_failure() {
    let h = initialized().await;
    let err = h.service.unlock(&secret("wrong password")).await.unwrap_err();
    assert!(matches!(err, LatchkeyError::InvalidCredentials));
    assert_eq!(h.service.backoff().failures(LOCAL_CALLER), 1);

    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();
    assert_eq!(h.service.backoff().failures(LOCAL_CALLER), 0);

    h.service.unlock(&secret("wrong again")).await.unwrap_err();
    h.service.lock(&token);
    assert_eq!(h.service.backoff().failures(LOCAL_CALLER), 0);
}

#[tokio::test]
async fn tampered_verify_blob_is_indistinguishable_from_wrong_password() {
    let h = initialized().await;
    let mut meta = h.store.get_metadata().await.unwrap().unwrap();
    meta.verify_blob = crypto::make_verify_blob(&MasterKey::new([3; 32])).unwrap();
    h.store
        .transaction(Box::new(move |tx: &mut dyn latchkey_core::VaultTransaction| {
            tx.put_metadata(&meta)
        }))
        .await
        .unwrap();

    let err = h.service.unlock(&secret(PASSWORD)).await.unwrap_err();
    assert_eq!(err.to_string(), "invalid credentials");
}

#[tokio::test]
async fn sixth_attempt_in_window_is_rate_limited() {
    let h = initialized().await;
    for _ in 0..5 {
        let err = h.service.unlock(&secret("nope nope")).await.unwrap_err();
        assert!(matches!(err, LatchkeyError::InvalidCredentials));
    }

    // Even the right password is refused until the window slides.
    let err = h.service.unlock(&secret(PASSWORD)).await.unwrap_err();
    match err {
        LatchkeyError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Duration::from_secs(60));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }

    h.clock.advance(Duration::from_secs(60));
    h.service.unlock(&secret(PASSWORD)).await.unwrap();
}

#[tokio::test]
async fn rate_limit_is_per_caller() {
    let h = initialized().await;
    for _ in 0..5 {
        h.service.unlock_as("10.0.0.1", &secret("nope nope")).await.unwrap_err();
    }
    assert!(matches!(
        h.service.unlock_as("10.0.0.1", &secret(PASSWORD)).await,
        Err(LatchkeyError::RateLimited { .. })
    ));
    h.service.unlock_as("10.0.0.2", &secret(PASSWORD)).await.unwrap();
}

#[tokio::test]
async fn password_change_guesses_share_the_rate_limit() {
    let h = initialized().await;
    let token = h.service.unlock_as("ops", &secret(PASSWORD)).await.unwrap();
    let before = snapshot(&h.store).await;

    for attempt in 1..=5 {
        let err = h
            .service
            .change_password_as("10.0.0.9", &token, &secret("guess guess"), &secret(NEW_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, LatchkeyError::InvalidCredentials));
        assert_eq!(h.service.backoff().failures("10.0.0.9"), attempt);
    }

    // The right current password is refused too until the window slides.
    let err = h
        .service
        .change_password_as("10.0.0.9", &token, &secret(PASSWORD), &secret(NEW_PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, LatchkeyError::RateLimited { .. }));

    // Nothing rotated and the session survived.
    assert_eq!(snapshot(&h.store).await, before);
    h.service.list_items(&token).await.unwrap();

    h.clock.advance(Duration::from_secs(60));
    let report = h
        .service
        .change_password_as("10.0.0.9", &token, &secret(PASSWORD), &secret(NEW_PASSWORD))
        .await
        .unwrap();
    assert_eq!(report.sessions_revoked, 1);
}

// --- Sessions ---

#[tokio::test]
async fn idle_session_expires_into_unauthorized() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();
    h.service
        .create_item(&token, "note", "first", &json!({"body": "x"}))
        .await
        .unwrap();

    h.clock.advance(Duration::from_secs(61));
    let err = h.service.list_items(&token).await.unwrap_err();
    assert!(matches!(err, LatchkeyError::Unauthorized));
}

#[tokio::test]
async fn lock_revokes_only_that_token() {
    let h = initialized().await;
    let a = h.service.unlock(&secret(PASSWORD)).await.unwrap();
    let b = h.service.unlock(&secret(PASSWORD)).await.unwrap();

    h.service.lock(&a);
    h.service.lock(&a);
    assert!(matches!(
        h.service.list_items(&a).await,
        Err(LatchkeyError::Unauthorized)
    ));
    assert!(h.service.list_items(&b).await.unwrap().is_empty());
}

// --- Records ---

#[tokio::test]
async fn record_crud_round_trip() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();

    let created = h
        .service
        .create_item(&token, "web", "Example", &json!({"user": "me", "pw": "p4ss"}))
        .await
        .unwrap();
    assert_eq!(created.record_type, "web");

    let item = h.service.get_item(&token, &created.id).await.unwrap();
    assert_eq!(item.payload, json!({"user": "me", "pw": "p4ss"}));
    assert_eq!(item.title, "Example");

    let stored = h.store.get_record(&created.id).await.unwrap().unwrap();
    assert!(!stored.envelope.contains("p4ss"));

    let updated = h
        .service
        .update_item(&token, &created.id, None, &json!({"user": "me", "pw": "n3w"}))
        .await
        .unwrap();
    assert_eq!(updated.title, "Example");
    let item = h.service.get_item(&token, &created.id).await.unwrap();
    assert_eq!(item.payload["pw"], "n3w");

    let renamed = h
        .service
        .update_item(&token, &created.id, Some("Renamed"), &json!({}))
        .await
        .unwrap();
    assert_eq!(renamed.title, "Renamed");

    h.service.delete_item(&token, &created.id).await.unwrap();
    assert!(matches!(
        h.service.get_item(&token, &created.id).await,
        Err(LatchkeyError::NotFound { .. })
    ));
    assert!(matches!(
        h.service.delete_item(&token, &created.id).await,
        Err(LatchkeyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn invalid_item_input_is_rejected() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();

    for (record_type, title, payload) in [
        ("", "t", json!({})),
        ("note", " ", json!({})),
        ("note", "t", json!(["not", "an", "object"])),
        ("note", "t", json!("string")),
    ] {
        let err = h
            .service
            .create_item(&token, record_type, title, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, LatchkeyError::InvalidInput(_)), "{err:?}");
    }
}

#[tokio::test]
async fn record_operations_require_a_token() {
    let h = initialized().await;
    let payload = json!({"a": 1});
    assert!(matches!(
        h.service.create_item("bogus", "note", "t", &payload).await,
        Err(LatchkeyError::Unauthorized)
    ));
    assert!(matches!(
        h.service.encrypt_record("bogus", "note", b"x").await,
        Err(LatchkeyError::Unauthorized)
    ));
    assert!(matches!(
        h.service.delete_item("bogus", "id").await,
        Err(LatchkeyError::Unauthorized)
    ));
}

#[tokio::test]
async fn listing_isolates_unreadable_records() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();
    let good = h
        .service
        .create_item(&token, "note", "good", &json!({"body": "ok"}))
        .await
        .unwrap();

    // A record relabelled to another type no longer authenticates.
    let mut relabelled = h.store.get_record(&good.id).await.unwrap().unwrap();
    relabelled.id = "relabelled".to_string();
    relabelled.record_type = "web".to_string();
    relabelled.updated_at += 10;
    h.store.insert_record(&relabelled).await.unwrap();

    let views = h.service.list_items(&token).await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].id(), "relabelled");
    assert!(matches!(views[0], ItemView::Unreadable { .. }));
    assert!(matches!(views[1], ItemView::Decrypted(_)));

    let err = h.service.get_item(&token, "relabelled").await.unwrap_err();
    assert!(err.is_record_unreadable());
}

#[tokio::test]
async fn record_types_are_listed_without_a_token() {
    let h = harness().await;
    let names: Vec<String> = h
        .service
        .record_types()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["email", "note", "ssh", "web"]);
}

// --- Rotation ---

#[tokio::test]
async fn end_to_end_scenario() {
    let h = harness().await;
    h.service.initialize(&secret(PASSWORD)).await.unwrap();
    assert!(h.service.status().await.unwrap().initialized);

    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();
    let plaintext = serde_json::to_vec(&json!({"body": "hi"})).unwrap();
    let envelope = h
        .service
        .encrypt_record(&token, "note", &plaintext)
        .await
        .unwrap();
    let opened = h
        .service
        .decrypt_record(&token, "note", &envelope)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&opened).unwrap();
    assert_eq!(value, json!({"body": "hi"}));

    let stored = h
        .service
        .create_item(&token, "note", "greeting", &json!({"body": "hi"}))
        .await
        .unwrap();

    let report = h
        .service
        .change_password(&token, &secret(PASSWORD), &secret(NEW_PASSWORD))
        .await
        .unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(report.sessions_revoked, 1);

    assert!(matches!(
        h.service.get_item(&token, &stored.id).await,
        Err(LatchkeyError::Unauthorized)
    ));
    assert!(matches!(
        h.service.decrypt_record(&token, "note", &envelope).await,
        Err(LatchkeyError::Unauthorized)
    ));
    assert!(matches!(
        h.service.unlock(&secret(PASSWORD)).await,
        Err(LatchkeyError::InvalidCredentials)
    ));

    let token = h.service.unlock(&secret(NEW_PASSWORD)).await.unwrap();
    let item = h.service.get_item(&token, &stored.id).await.unwrap();
    assert_eq!(item.payload, json!({"body": "hi"}));

    let meta = h.store.get_metadata().await.unwrap().unwrap();
    assert!(meta.last_rotated_at.is_some());
}

#[tokio::test]
async fn rotation_with_unreadable_record_rolls_back_everything() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();

    h.service
        .create_item(&token, "web", "first", &json!({"n": 1}))
        .await
        .unwrap();
    // Second record was sealed under some other key.
    let foreign = MasterKey::new([0x42; 32]);
    h.store
        .insert_record(&EncryptedRecord {
            id: "foreign".to_string(),
            record_type: "note".to_string(),
            title: "second".to_string(),
            envelope: crypto::encrypt(&foreign, b"{}", &crypto::record_aad("note")).unwrap(),
            created_at: 1,
            updated_at: 1,
        })
        .await
        .unwrap();
    h.service
        .create_item(&token, "email", "third", &json!({"n": 3}))
        .await
        .unwrap();

    let before = snapshot(&h.store).await;

    let err = h
        .service
        .change_password(&token, &secret(PASSWORD), &secret(NEW_PASSWORD))
        .await
        .unwrap_err();
    match &err {
        LatchkeyError::RotationFailed { reason } => assert!(reason.contains("foreign")),
        other => panic!("expected RotationFailed, got {other:?}"),
    }

    assert_eq!(snapshot(&h.store).await, before);
    // Sessions survive a failed rotation and the old password still works.
    assert!(h.service.list_items(&token).await.is_ok());
    h.service.unlock(&secret(PASSWORD)).await.unwrap();
    assert!(matches!(
        h.service.unlock(&secret(NEW_PASSWORD)).await,
        Err(LatchkeyError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn rotation_checks_preconditions() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();

    assert!(matches!(
        h.service
            .change_password("bogus", &secret(PASSWORD), &secret(NEW_PASSWORD))
            .await,
        Err(LatchkeyError::Unauthorized)
    ));
    assert!(matches!(
        h.service
            .change_password(&token, &secret("not the password"), &secret(NEW_PASSWORD))
            .await,
        Err(LatchkeyError::InvalidCredentials)
    ));
    assert!(matches!(
        h.service
            .change_password(&token, &secret(PASSWORD), &secret("short"))
            .await,
        Err(LatchkeyError::WeakPassword { .. })
    ));

    // Nothing changed.
    h.service.unlock(&secret(PASSWORD)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_never_survive_under_the_old_key() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();

    let mut writers = Vec::new();
    for i in 0..16 {
        let service = h.service.clone();
        let token = token.clone();
        writers.push(tokio::spawn(async move {
            service
                .create_item(&token, "note", &format!("item {i}"), &json!({"i": i}))
                .await
        }));
    }
    h.service
        .change_password(&token, &secret(PASSWORD), &secret(NEW_PASSWORD))
        .await
        .unwrap();

    let mut created = 0;
    for writer in writers {
        match writer.await.unwrap() {
            Ok(_) => created += 1,
            Err(LatchkeyError::Unauthorized) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    let token = h.service.unlock(&secret(NEW_PASSWORD)).await.unwrap();
    let views = h.service.list_items(&token).await.unwrap();
    assert_eq!(views.len(), created);
    assert!(views.iter().all(ItemView::is_readable));
}

// --- Logging ---

#[tokio::test]
#[traced_test]
async fn secrets_never_reach_the_logs() {
    let h = initialized().await;
    let token = h.service.unlock(&secret(PASSWORD)).await.unwrap();
    h.service
        .create_item(&token, "note", "diary", &json!({"body": "tell no one"}))
        .await
        .unwrap();
    h.service.unlock(&secret("Wr0ng-Password!")).await.unwrap_err();
    h.service
        .change_password(&token, &secret(PASSWORD), &secret(NEW_PASSWORD))
        .await
        .unwrap();

    assert!(logs_contain("vault unlocked"));
    assert!(logs_contain("record created"));
    assert!(logs_contain("rotation committed"));
    assert!(!logs_contain(PASSWORD));
    assert!(!logs_contain(NEW_PASSWORD));
    assert!(!logs_contain("Wr0ng-Password!"));
    assert!(!logs_contain(&token));
    assert!(!logs_contain("tell no one"));
}
