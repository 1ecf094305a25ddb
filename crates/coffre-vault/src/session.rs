//! Session store — unlock/wipe orchestration and decrypted-document
//! ownership.
//!
//! State machine: `Locked → Unlocking → {Unlocked | Locked(with error)}`,
//! and `Unlocked → Locked` via [`SessionStore::wipe`]. The store is the
//! single writer of session state; decrypted content exists nowhere else.
//!
//! The unlock ceremony, in order, short-circuiting on first failure:
//!
//! 1. Rate-limiter gate — fail `RateLimited` without touching the passphrase
//! 2. Schema gate — `VaultEmpty` / `MalformedManifest` (no limiter penalty)
//! 3. Derive both keys (PBKDF2, deliberately slow)
//! 4. Verify the manifest digest — `IntegrityFailure` (penalized)
//! 5. Decrypt every document in manifest order — any failure is
//!    `InvalidPassphrase` (penalized), and nothing partial is surfaced
//! 6. Success — limiter reset, documents populated, error cleared
//!
//! Steps 3–5 are CPU-bound; [`unlock_shared`] runs them with the store
//! mutex released so observers stay responsive, and re-checks the
//! `wipe_requested` flag before committing so a wipe issued mid-unlock
//! always wins.

use crate::error::VaultError;
use crate::manifest::{Manifest, Priority};
use crate::ratelimit::RateLimiter;
use coffre_crypto_core::integrity::{self, DIGEST_LEN};
use coffre_crypto_core::kdf::{self, SALT_LEN};
use coffre_crypto_core::memory::SecretBuffer;
use coffre_crypto_core::symmetric::{self, NONCE_LEN};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A decrypted document, session-scoped.
///
/// Exists only between a successful unlock and the next wipe. The body
/// lives in a [`SecretBuffer`] (zeroized on drop), so dropping the value
/// IS the secure erasure — there is no separate scrub step to forget.
pub struct DecryptedDocument {
    /// Stable handle carried over from the manifest record.
    pub id: String,
    /// Cleartext title.
    pub title: String,
    /// Priority bucket.
    pub priority: Priority,
    /// Cleartext tags.
    pub tags: Vec<String>,
    /// The decrypted markdown body.
    pub content: SecretBuffer,
}

impl DecryptedDocument {
    /// The body as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(self.content.expose()).ok()
    }
}

impl fmt::Debug for DecryptedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedDocument")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("content", &"***")
            .finish_non_exhaustive()
    }
}

/// Why a wipe fired — logged, never secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// The user asked to lock.
    Explicit,
    /// The inactivity timer elapsed.
    IdleTimeout,
    /// The panic gesture fired.
    PanicKey,
    /// Process/view teardown.
    Unload,
}

/// The unlock failure category held in session state for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockErrorKind {
    /// Lockout window active.
    RateLimited,
    /// Manifest missing or empty.
    VaultEmpty,
    /// Manifest failed schema validation.
    MalformedManifest,
    /// Digest mismatch over the document list.
    IntegrityFailure,
    /// Wrong passphrase or per-document authentication failure.
    InvalidPassphrase,
}

impl UnlockErrorKind {
    fn from_error(err: &VaultError) -> Option<Self> {
        match err {
            VaultError::RateLimited { .. } => Some(Self::RateLimited),
            VaultError::VaultEmpty => Some(Self::VaultEmpty),
            // A KeyDerivation error here means the salt slipped past schema
            // validation — treat it as the manifest defect it is.
            VaultError::MalformedManifest(_) | VaultError::Crypto(_) => {
                Some(Self::MalformedManifest)
            }
            VaultError::IntegrityFailure => Some(Self::IntegrityFailure),
            VaultError::InvalidPassphrase => Some(Self::InvalidPassphrase),
            _ => None,
        }
    }
}

/// Everything an unlock needs once the gates have passed, decoded and
/// detached from the store so the slow work can run without the lock.
pub struct UnlockJob {
    salt: [u8; SALT_LEN],
    expected_hmac: Option<[u8; DIGEST_LEN]>,
    canonical: Vec<u8>,
    records: Vec<SealedRecord>,
}

struct SealedRecord {
    id: String,
    title: String,
    priority: Priority,
    tags: Vec<String>,
    nonce: [u8; NONCE_LEN],
    data: Vec<u8>,
}

/// Session store shared between the unlock path and the trigger threads.
pub type SharedSession = Arc<Mutex<SessionStore>>;

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Owns the manifest, the rate limiter, and all decrypted material.
pub struct SessionStore {
    manifest: Manifest,
    limiter: RateLimiter,
    documents: Vec<DecryptedDocument>,
    unlocked: bool,
    verified_integrity: bool,
    error: Option<UnlockErrorKind>,
    is_decrypting: bool,
    wipe_requested: bool,
    hidden_at: Option<Instant>,
}

impl SessionStore {
    /// A locked session over `manifest` with a fresh limiter.
    #[must_use]
    pub fn new(manifest: Manifest) -> Self {
        Self::with_limiter(manifest, RateLimiter::new())
    }

    /// A locked session with an injected limiter (tests, custom wiring).
    #[must_use]
    pub const fn with_limiter(manifest: Manifest, limiter: RateLimiter) -> Self {
        Self {
            manifest,
            limiter,
            documents: Vec::new(),
            unlocked: false,
            verified_integrity: false,
            error: None,
            is_decrypting: false,
            wipe_requested: false,
            hidden_at: None,
        }
    }

    /// A locked session wrapped for sharing with trigger threads.
    #[must_use]
    pub fn shared(manifest: Manifest) -> SharedSession {
        Arc::new(Mutex::new(Self::new(manifest)))
    }

    // ── Read access ────────────────────────────────────────────────

    /// Whether the session currently holds decrypted documents.
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Whether an unlock attempt is outstanding.
    #[must_use]
    pub const fn is_decrypting(&self) -> bool {
        self.is_decrypting
    }

    /// The decrypted documents, in manifest order. Empty when locked.
    #[must_use]
    pub fn documents(&self) -> &[DecryptedDocument] {
        &self.documents
    }

    /// Look up one decrypted document by its manifest id.
    #[must_use]
    pub fn document(&self, id: &str) -> Option<&DecryptedDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// The last unlock failure, cleared on success and on wipe.
    #[must_use]
    pub const fn error(&self) -> Option<UnlockErrorKind> {
        self.error
    }

    /// Milliseconds until the lockout gate opens; 0 when open.
    #[must_use]
    pub fn lockout_remaining_ms(&self) -> u64 {
        self.limiter
            .remaining()
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    /// Failed attempts since the last success.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.limiter.attempts()
    }

    /// `false` on the reduced-trust path: the session unlocked from a
    /// manifest that carried no integrity digest.
    #[must_use]
    pub const fn verified_integrity(&self) -> bool {
        self.verified_integrity
    }

    /// The manifest this session serves (cleartext metadata is browsable
    /// while locked).
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// When the view was last hidden, if ever. Observability only.
    #[must_use]
    pub const fn hidden_at(&self) -> Option<Instant> {
        self.hidden_at
    }

    // ── Unlock ─────────────────────────────────────────────────────

    /// Run the full unlock ceremony synchronously.
    ///
    /// Single-threaded convenience path; concurrent embedders should use
    /// [`unlock_shared`] so the slow derivation runs without the store
    /// locked.
    ///
    /// # Errors
    ///
    /// See the module docs for the failure ladder. On `Ok(())` the session
    /// either holds every document decrypted — or stayed locked because a
    /// wipe was requested mid-unlock, which callers observe via
    /// [`is_unlocked`](Self::is_unlocked).
    pub fn unlock(&mut self, passphrase: &str) -> Result<(), VaultError> {
        let job = self.begin_unlock()?;
        let outcome = perform_unlock(&job, passphrase);
        self.finish_unlock(outcome)
    }

    /// Gate checks + manifest decode; flips `is_decrypting` on success.
    ///
    /// # Errors
    ///
    /// `UnlockInProgress`, `RateLimited`, `VaultEmpty`, or
    /// `MalformedManifest` — none of which penalize the limiter.
    pub fn begin_unlock(&mut self) -> Result<UnlockJob, VaultError> {
        if self.is_decrypting {
            return Err(VaultError::UnlockInProgress);
        }

        // 1. Limiter gate — the passphrase is not touched past this point
        //    until the gate is open.
        if let Some(remaining) = self.limiter.remaining() {
            self.error = Some(UnlockErrorKind::RateLimited);
            return Err(VaultError::RateLimited {
                remaining_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            });
        }

        // 2. Schema gates — configuration defects, no penalty.
        if self.manifest.is_empty() {
            self.error = Some(UnlockErrorKind::VaultEmpty);
            return Err(VaultError::VaultEmpty);
        }
        if let Err(err) = self.manifest.validate() {
            self.error = UnlockErrorKind::from_error(&err);
            return Err(err);
        }

        let job = match self.decode_job() {
            Ok(job) => job,
            Err(err) => {
                self.error = UnlockErrorKind::from_error(&err);
                return Err(err);
            }
        };

        self.is_decrypting = true;
        Ok(job)
    }

    /// Decode every encoded manifest field into an [`UnlockJob`].
    fn decode_job(&self) -> Result<UnlockJob, VaultError> {
        let salt = self.manifest.decode_salt()?;
        let expected_hmac = self.manifest.decode_hmac()?;
        let canonical = self.manifest.canonical_files_bytes()?;

        let mut records = Vec::with_capacity(self.manifest.files.len());
        for file in &self.manifest.files {
            records.push(SealedRecord {
                id: file.id.clone(),
                title: file.title.clone(),
                priority: file.priority,
                tags: file.tags.clone(),
                nonce: file.decode_iv()?,
                data: file.decode_data()?,
            });
        }

        Ok(UnlockJob {
            salt,
            expected_hmac,
            canonical,
            records,
        })
    }

    /// Commit the outcome of [`perform_unlock`], honoring a wipe that was
    /// requested while the unlock was in flight.
    ///
    /// # Errors
    ///
    /// Propagates the unlock failure after recording it and applying the
    /// limiter penalty where due.
    pub fn finish_unlock(
        &mut self,
        outcome: Result<(Vec<DecryptedDocument>, bool), VaultError>,
    ) -> Result<(), VaultError> {
        self.is_decrypting = false;

        if self.wipe_requested {
            // A wipe arrived while we were decrypting: the resolved result
            // must not resurrect the session. Decrypted buffers drop (and
            // zeroize) here.
            self.wipe_requested = false;
            self.apply_wipe();
            tracing::info!("unlock result discarded: wipe was requested mid-unlock");
            return Ok(());
        }

        match outcome {
            Ok((documents, verified)) => {
                self.limiter.reset();
                self.documents = documents;
                self.unlocked = true;
                self.verified_integrity = verified;
                self.error = None;
                tracing::info!(
                    documents = self.documents.len(),
                    verified_integrity = verified,
                    "vault unlocked"
                );
                Ok(())
            }
            Err(err) => {
                if err.penalizes_limiter() {
                    self.limiter.record_failure();
                }
                self.error = UnlockErrorKind::from_error(&err);
                tracing::warn!(
                    attempts = self.limiter.attempts(),
                    kind = ?self.error,
                    "unlock failed"
                );
                Err(err)
            }
        }
    }

    // ── Wipe ───────────────────────────────────────────────────────

    /// Wipe with [`LockReason::Explicit`].
    pub fn wipe(&mut self) {
        self.wipe_with_reason(LockReason::Explicit);
    }

    /// Clear all decrypted material and return to the locked state.
    ///
    /// Idempotent — safe from the locked state. If an unlock is in
    /// flight, the wipe is deferred and wins when the unlock resolves.
    /// Never touches rate-limiter state.
    pub fn wipe_with_reason(&mut self, reason: LockReason) {
        if self.is_decrypting {
            self.wipe_requested = true;
            tracing::debug!(?reason, "wipe deferred until pending unlock resolves");
            return;
        }
        let was_unlocked = self.unlocked;
        self.apply_wipe();
        if was_unlocked {
            tracing::info!(?reason, "vault locked");
        }
    }

    fn apply_wipe(&mut self) {
        // Dropping each DecryptedDocument zeroizes its content buffer.
        self.documents.clear();
        self.unlocked = false;
        self.verified_integrity = false;
        self.error = None;
        self.is_decrypting = false;
        // self.limiter deliberately untouched.
    }

    // ── Visibility ─────────────────────────────────────────────────

    /// Record that the view was hidden. Deliberately does NOT wipe —
    /// the inactivity timer closes that window. Revisit if the threat
    /// model tightens.
    pub fn note_hidden(&mut self) {
        self.hidden_at = Some(Instant::now());
        tracing::debug!("view hidden");
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("unlocked", &self.unlocked)
            .field("documents", &self.documents.len())
            .field("is_decrypting", &self.is_decrypting)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// The slow half — runs without the store lock
// ---------------------------------------------------------------------------

/// Derive keys, verify the digest, and decrypt every document.
///
/// Pure in its inputs — no session state is read or written, so this can
/// run on any thread. Returns the documents plus whether the manifest
/// digest was actually verified (`false` on the digest-absent path).
///
/// # Errors
///
/// `IntegrityFailure` on digest mismatch; `InvalidPassphrase` on any
/// per-document authentication failure. Either all documents decrypt or
/// none are returned.
pub fn perform_unlock(
    job: &UnlockJob,
    passphrase: &str,
) -> Result<(Vec<DecryptedDocument>, bool), VaultError> {
    // 3. Derive both keys (slow by design).
    let keys = kdf::derive_keys(passphrase.as_bytes(), &job.salt)?;

    // 4. Verify manifest integrity before any decryption.
    let verified = match &job.expected_hmac {
        Some(expected) => {
            if !integrity::verify(&keys.integrity, &job.canonical, expected) {
                return Err(VaultError::IntegrityFailure);
            }
            true
        }
        // Digest-absent manifests pass trivially — reduced trust.
        None => false,
    };

    // 5. Decrypt all documents, in manifest order, all-or-nothing.
    let mut documents = Vec::with_capacity(job.records.len());
    for record in &job.records {
        let content = symmetric::decrypt(&record.nonce, &record.data, &keys.encryption)
            .map_err(|_| VaultError::InvalidPassphrase)?;
        documents.push(DecryptedDocument {
            id: record.id.clone(),
            title: record.title.clone(),
            priority: record.priority,
            tags: record.tags.clone(),
            content,
        });
    }

    Ok((documents, verified))
}

/// Unlock a shared session, keeping the mutex released for the slow
/// derivation/decryption phase.
///
/// This is the path embedders should call from a background task: the
/// store is locked only for the brief gate/commit sections, so status
/// reads and wipe requests stay responsive during the ~hundreds of
/// milliseconds of PBKDF2 work.
///
/// # Errors
///
/// Same ladder as [`SessionStore::unlock`].
pub fn unlock_shared(session: &SharedSession, passphrase: &str) -> Result<(), VaultError> {
    let job = lock_store(session).begin_unlock()?;
    let outcome = perform_unlock(&job, passphrase);
    lock_store(session).finish_unlock(outcome)
}

/// Lock the store, recovering from a poisoned mutex — session state is
/// always safe to observe, and a panicked writer must not wedge the
/// trigger threads out of wiping.
pub fn lock_store(session: &SharedSession) -> MutexGuard<'_, SessionStore> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
