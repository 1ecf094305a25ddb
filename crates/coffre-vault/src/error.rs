//! Vault error types for `coffre-vault`.

use coffre_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Too many failed unlock attempts — lockout window active.
    #[error("rate limited: {remaining_ms}ms remaining")]
    RateLimited {
        /// Milliseconds remaining in the lockout window.
        remaining_ms: u64,
    },

    /// Manifest has no salt or no documents — a build/packaging defect,
    /// not a security failure. Does not penalize the rate limiter.
    #[error("vault is empty or missing its manifest")]
    VaultEmpty,

    /// A manifest field failed schema validation (bad hex/Base64 encoding,
    /// wrong salt/iv/digest length). Also a configuration defect — no
    /// limiter penalty.
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// The manifest HMAC did not match the document list.
    #[error("manifest integrity check failed")]
    IntegrityFailure,

    /// Wrong passphrase, or any per-document authentication failure.
    /// The two are indistinguishable by design.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// An unlock attempt was started while another is still outstanding.
    #[error("an unlock attempt is already in progress")]
    UnlockInProgress,

    /// Two documents were authored with the same nonce — refusing to emit
    /// a manifest that would break confidentiality.
    #[error("duplicate nonce across documents")]
    DuplicateNonce,

    /// Authoring input problem (unreadable document, bad front matter).
    #[error("authoring error: {0}")]
    Authoring(String),

    /// I/O error from the filesystem (authoring, preferences).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Whether this failure counts against the rate limiter.
    ///
    /// Only `IntegrityFailure` and `InvalidPassphrase` do: both are
    /// observable by an attacker probing passphrases. Configuration
    /// defects (`VaultEmpty`, `MalformedManifest`) and the gate itself
    /// (`RateLimited`) never penalize.
    #[must_use]
    pub const fn penalizes_limiter(&self) -> bool {
        matches!(self, Self::IntegrityFailure | Self::InvalidPassphrase)
    }

    /// User-facing message for an unlock failure.
    ///
    /// `IntegrityFailure` and `InvalidPassphrase` deliberately share one
    /// generic message so the UI cannot leak which occurred.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::IntegrityFailure | Self::InvalidPassphrase => {
                "Incorrect passphrase. Please try again.".into()
            }
            Self::RateLimited { remaining_ms } => {
                let secs = remaining_ms.saturating_add(999) / 1000;
                format!("Too many attempts. Try again in {secs} seconds.")
            }
            Self::VaultEmpty => "No vault is bundled with this application.".into(),
            Self::MalformedManifest(_) => "The vault manifest is damaged.".into(),
            Self::UnlockInProgress => "An unlock attempt is already running.".into(),
            Self::DuplicateNonce | Self::Authoring(_) | Self::Crypto(_) | Self::Io(_) => {
                "Internal error. Please try again.".into()
            }
        }
    }
}
