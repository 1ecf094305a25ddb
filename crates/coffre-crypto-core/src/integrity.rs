//! HMAC-SHA256 manifest integrity digest.
//!
//! The authoring tool signs the canonical serialization of the ordered
//! document list; the runtime verifies it before any decryption is
//! attempted. Verification is constant-time in the digest bytes — ring's
//! verified comparison, not a short-circuiting byte loop — so the digest
//! value itself leaks nothing through timing.

use crate::memory::KeyMaterial;
use ring::hmac;

/// HMAC-SHA256 digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Compute the HMAC-SHA256 digest of `message` under the integrity key.
#[must_use]
pub fn sign(key: &KeyMaterial, message: &[u8]) -> [u8; DIGEST_LEN] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key.expose());
    let tag = hmac::sign(&key, message);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(tag.as_ref());
    out
}

/// Verify `expected` against the HMAC-SHA256 digest of `message`.
///
/// A wrong-length `expected` fails immediately (length is not secret);
/// the byte comparison itself is constant-time.
#[must_use]
pub fn verify(key: &KeyMaterial, message: &[u8], expected: &[u8]) -> bool {
    if expected.len() != DIGEST_LEN {
        return false;
    }
    let key = hmac::Key::new(hmac::HMAC_SHA256, key.expose());
    hmac::verify(&key, message, expected).is_ok()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::KEY_LEN;

    fn test_key() -> KeyMaterial {
        KeyMaterial::new([0x11; KEY_LEN])
    }

    #[test]
    fn sign_verify_roundtrip() {
        let digest = sign(&test_key(), b"ordered document list");
        assert!(verify(&test_key(), b"ordered document list", &digest));
    }

    #[test]
    fn sign_is_deterministic() {
        let a = sign(&test_key(), b"payload");
        let b = sign(&test_key(), b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn verify_rejects_modified_message() {
        let digest = sign(&test_key(), b"payload");
        assert!(!verify(&test_key(), b"payloae", &digest));
    }

    #[test]
    fn verify_rejects_modified_digest() {
        let mut digest = sign(&test_key(), b"payload");
        digest[0] ^= 0x01;
        assert!(!verify(&test_key(), b"payload", &digest));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let digest = sign(&test_key(), b"payload");
        let other = KeyMaterial::new([0x22; KEY_LEN]);
        assert!(!verify(&other, b"payload", &digest));
    }

    #[test]
    fn verify_rejects_wrong_length_digest() {
        assert!(!verify(&test_key(), b"payload", &[0u8; 31]));
        assert!(!verify(&test_key(), b"payload", &[0u8; 33]));
        assert!(!verify(&test_key(), b"payload", &[]));
    }

    #[test]
    fn different_keys_produce_different_digests() {
        let a = sign(&test_key(), b"payload");
        let b = sign(&KeyMaterial::new([0x22; KEY_LEN]), b"payload");
        assert_ne!(a, b);
    }
}
