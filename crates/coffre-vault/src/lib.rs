//! `coffre-vault` — Vault business logic for Coffre.
//!
//! Owns the manifest schema, the unlock/wipe session lifecycle, the
//! progressive-lockout rate limiter, the idle/panic trigger wiring, and
//! the offline authoring path that produces manifests in the first place.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod manifest;

pub mod ratelimit;
pub mod session;

pub mod triggers;

pub mod authoring;

pub mod preferences;

pub use authoring::{parse_document, seal_directory, seal_documents, AuthoredDocument};
pub use error::VaultError;
pub use manifest::{DocumentRecord, Manifest, Priority};
pub use preferences::Preferences;
pub use ratelimit::{
    lockout_duration, LimiterStatus, RateLimiter, FAILURE_THRESHOLD, LOCKOUT_BASE_SECS,
    LOCKOUT_CAP_SECS,
};
pub use session::{
    lock_store, unlock_shared, DecryptedDocument, LockReason, SessionStore, SharedSession,
    UnlockErrorKind,
};
pub use triggers::{
    note_hidden, on_unload, panic_wipe, spawn_auto_lock, AutoLockTimer,
    DEFAULT_INACTIVITY_TIMEOUT_MINUTES, TIMER_CHECK_INTERVAL_SECS,
};
