//! AES-256-GCM authenticated encryption for document bodies.
//!
//! This module provides:
//! - [`encrypt`] — seal plaintext under a fresh random nonce, returning
//!   [`SealedDocument`]
//! - [`decrypt`] — open and authenticate `ciphertext || tag`, returning a
//!   [`SecretBuffer`]
//!
//! Wire shape matches the manifest: the 12-byte nonce travels in the `iv`
//! field, and `data` is the ciphertext with the 16-byte GCM tag appended.
//!
//! Nonce uniqueness under a given key is a hard precondition, not a
//! convention — a repeated nonce silently breaks confidentiality. [`encrypt`]
//! draws every nonce fresh from the OS CSPRNG; the authoring layer
//! additionally refuses to emit a manifest containing a duplicate.

use crate::error::CryptoError;
use crate::memory::{fill_random, KeyMaterial, SecretBuffer};
use ring::aead;
use zeroize::Zeroize;

/// AES-256-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One encrypted document body: random nonce + `ciphertext || tag`.
///
/// Any modification to the nonce, ciphertext, or tag causes decryption to
/// fail with the opaque [`CryptoError::Decryption`].
#[must_use = "sealed data must be stored in the manifest"]
#[derive(Clone, Debug)]
pub struct SealedDocument {
    /// 96-bit random nonce, unique per encryption.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the 128-bit authentication tag appended.
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Encrypt / decrypt
// ---------------------------------------------------------------------------

/// Encrypt a document body under a fresh random 96-bit nonce.
///
/// The plaintext may be empty, in which case `data` is just the tag.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the underlying AEAD operation
/// fails.
pub fn encrypt(plaintext: &[u8], key: &KeyMaterial) -> Result<SealedDocument, CryptoError> {
    let sealing_key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    fill_random(&mut nonce_bytes);
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    // Encrypt in place, tag appended — this buffer IS the manifest `data`.
    let mut in_out = plaintext.to_vec();
    if sealing_key
        .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "AES-256-GCM encryption failed".into(),
        ));
    }

    Ok(SealedDocument {
        nonce: nonce_bytes,
        data: in_out,
    })
}

/// Decrypt and authenticate `ciphertext || tag`.
///
/// Returns the plaintext as a [`SecretBuffer`] (zeroized on drop). The
/// scratch buffer is zeroized after the copy.
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] for every failure mode — truncated
/// input, tag mismatch, wrong key. Callers get no signal which it was.
pub fn decrypt(
    nonce: &[u8; NONCE_LEN],
    data: &[u8],
    key: &KeyMaterial,
) -> Result<SecretBuffer, CryptoError> {
    if data.len() < TAG_LEN {
        return Err(CryptoError::Decryption);
    }

    let opening_key = aead_key(key)?;
    let nonce = aead::Nonce::assume_unique_for_key(*nonce);

    let mut in_out = data.to_vec();
    let plaintext = opening_key
        .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Decryption)?;

    let result = SecretBuffer::new(plaintext);
    in_out.zeroize();
    Ok(result)
}

/// Build the ring AEAD key for a 256-bit key.
fn aead_key(key: &KeyMaterial) -> Result<aead::LessSafeKey, CryptoError> {
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key.expose())
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::KEY_LEN;

    fn test_key() -> KeyMaterial {
        KeyMaterial::new([0xAA; KEY_LEN])
    }

    fn wrong_key() -> KeyMaterial {
        KeyMaterial::new([0xBB; KEY_LEN])
    }

    #[test]
    fn encrypt_produces_correct_lengths() {
        let plaintext = b"# Incident Response\n\ncall the on-call first";
        let sealed = encrypt(plaintext, &test_key()).expect("encrypt should succeed");
        assert_eq!(sealed.nonce.len(), NONCE_LEN);
        assert_eq!(sealed.data.len(), plaintext.len() + TAG_LEN);
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let plaintext = b"vault document body";
        let sealed = encrypt(plaintext, &test_key()).expect("encrypt should succeed");
        let opened =
            decrypt(&sealed.nonce, &sealed.data, &test_key()).expect("decrypt should succeed");
        assert_eq!(opened.expose(), plaintext);
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let sealed = encrypt(&[], &test_key()).expect("encrypt empty should succeed");
        assert_eq!(sealed.data.len(), TAG_LEN);
        let opened =
            decrypt(&sealed.nonce, &sealed.data, &test_key()).expect("decrypt should succeed");
        assert!(opened.expose().is_empty());
    }

    #[test]
    fn decrypt_fails_on_tampered_ciphertext() {
        let mut sealed = encrypt(b"tamper target", &test_key()).expect("encrypt should succeed");
        sealed.data[0] ^= 0xFF;
        let result = decrypt(&sealed.nonce, &sealed.data, &test_key());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn decrypt_fails_on_tampered_tag() {
        let mut sealed = encrypt(b"tamper target", &test_key()).expect("encrypt should succeed");
        let last = sealed.data.len() - 1;
        sealed.data[last] ^= 0xFF;
        let result = decrypt(&sealed.nonce, &sealed.data, &test_key());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let sealed = encrypt(b"secret", &test_key()).expect("encrypt should succeed");
        let result = decrypt(&sealed.nonce, &sealed.data, &wrong_key());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn decrypt_fails_with_modified_nonce() {
        let mut sealed = encrypt(b"secret", &test_key()).expect("encrypt should succeed");
        sealed.nonce[0] ^= 0xFF;
        let result = decrypt(&sealed.nonce, &sealed.data, &test_key());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn decrypt_rejects_truncated_input() {
        let result = decrypt(&[0u8; NONCE_LEN], &[0u8; TAG_LEN - 1], &test_key());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn two_encrypts_produce_different_nonces() {
        let a = encrypt(b"same body", &test_key()).expect("encrypt should succeed");
        let b = encrypt(b"same body", &test_key()).expect("encrypt should succeed");
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn decrypt_output_is_secret_buffer() {
        let sealed = encrypt(b"secret", &test_key()).expect("encrypt should succeed");
        let opened =
            decrypt(&sealed.nonce, &sealed.data, &test_key()).expect("decrypt should succeed");
        assert_eq!(format!("{opened:?}"), "SecretBuffer(***)");
    }
}
