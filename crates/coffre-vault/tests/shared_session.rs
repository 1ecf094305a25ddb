#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for the shared-session path: unlocking with the
//! store mutex released, trigger-driven wipes, and the wipe-during-unlock
//! race.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use coffre_vault::{
    lock_store, on_unload, panic_wipe, seal_documents, unlock_shared, AuthoredDocument, Priority,
    SessionStore, SharedSession, VaultError,
};

const PASSPHRASE: &str = "correct horse battery staple";

fn shared_session() -> SharedSession {
    let manifest = seal_documents(
        PASSPHRASE.as_bytes(),
        &[AuthoredDocument {
            title: "Recovery Codes".into(),
            priority: Priority::High,
            tags: vec!["test".into()],
            body: "code-one\ncode-two".into(),
        }],
    )
    .expect("seal should succeed");
    SessionStore::shared(manifest)
}

/// Block until the session reports an in-flight unlock.
///
/// The PBKDF2 phase takes hundreds of milliseconds, so once observed the
/// unlock is reliably still running.
fn wait_for_decrypting(session: &SharedSession) {
    let mut spins = 0;
    while !lock_store(session).is_decrypting() {
        spins += 1;
        assert!(spins < 5_000, "unlock never entered the decrypting phase");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn unlock_shared_populates_the_store() {
    let session = shared_session();
    unlock_shared(&session, PASSPHRASE).expect("unlock should succeed");

    let store = lock_store(&session);
    assert!(store.is_unlocked());
    assert!(store.verified_integrity());
    assert_eq!(store.documents().len(), 1);
    assert_eq!(
        store.documents()[0].content_str().unwrap(),
        "code-one\ncode-two"
    );
}

#[test]
fn unlock_shared_penalizes_a_wrong_passphrase() {
    let session = shared_session();
    let err = unlock_shared(&session, "wrong passphrase").expect_err("must fail");
    assert!(matches!(err, VaultError::InvalidPassphrase));

    let store = lock_store(&session);
    assert_eq!(store.attempts(), 1);
    assert!(!store.is_unlocked());
}

#[test]
fn panic_wipe_during_inflight_unlock_leaves_the_session_locked() {
    let session = shared_session();

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || unlock_shared(&session, PASSPHRASE))
    };

    wait_for_decrypting(&session);
    panic_wipe(&session);

    worker
        .join()
        .expect("worker thread")
        .expect("a discarded unlock reports Ok");

    let store = lock_store(&session);
    assert!(!store.is_unlocked(), "wipe must win over the resolved unlock");
    assert!(store.documents().is_empty());
    assert!(!store.is_decrypting());
}

#[test]
fn second_unlock_shared_while_one_is_in_flight_is_rejected() {
    let session = shared_session();

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || unlock_shared(&session, PASSPHRASE))
    };

    wait_for_decrypting(&session);
    let err = unlock_shared(&session, PASSPHRASE).expect_err("second attempt must be rejected");
    assert!(matches!(err, VaultError::UnlockInProgress));

    worker
        .join()
        .expect("worker thread")
        .expect("first unlock succeeds");
    assert!(lock_store(&session).is_unlocked());
}

#[test]
fn teardown_wipe_after_a_successful_unlock() {
    let session = shared_session();
    unlock_shared(&session, PASSPHRASE).expect("unlock should succeed");
    assert!(lock_store(&session).is_unlocked());

    on_unload(&session);
    on_unload(&session);

    let store = lock_store(&session);
    assert!(!store.is_unlocked());
    assert!(store.documents().is_empty());
}
