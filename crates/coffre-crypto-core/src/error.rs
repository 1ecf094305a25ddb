//! Cryptographic error types for `coffre-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed (bad salt length, PBKDF2 parameter error).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption failure (AES-256-GCM).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authenticated decryption failed.
    ///
    /// Deliberately opaque: tag mismatch, truncated ciphertext, and a wrong
    /// key all surface as this one variant so a caller cannot build a
    /// decryption oracle out of the error value.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,
}
