#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for AES-256-GCM symmetric encryption.

use coffre_crypto_core::memory::{KeyMaterial, KEY_LEN};
use coffre_crypto_core::symmetric::{decrypt, encrypt, TAG_LEN};
use proptest::prelude::*;

/// Fixed key bytes for property tests.
const PROP_KEY: [u8; KEY_LEN] = [0xCC; KEY_LEN];

proptest! {
    /// Encrypt→decrypt roundtrip always recovers the original plaintext,
    /// including the empty body and bodies with embedded NUL bytes.
    #[test]
    fn encrypt_decrypt_roundtrip(
        plaintext in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let key = KeyMaterial::new(PROP_KEY);
        let sealed = encrypt(&plaintext, &key).expect("encrypt should succeed");
        let opened = decrypt(&sealed.nonce, &sealed.data, &key)
            .expect("decrypt should succeed");
        prop_assert_eq!(opened.expose(), plaintext.as_slice());
    }

    /// Flipping any single byte of `ciphertext || tag` makes decryption fail.
    #[test]
    fn any_bitflip_breaks_authentication(
        plaintext in proptest::collection::vec(any::<u8>(), 1..512),
        flip_seed in any::<usize>(),
    ) {
        let key = KeyMaterial::new(PROP_KEY);
        let mut sealed = encrypt(&plaintext, &key).expect("encrypt should succeed");
        let idx = flip_seed % sealed.data.len();
        sealed.data[idx] ^= 0x01;
        prop_assert!(decrypt(&sealed.nonce, &sealed.data, &key).is_err());
    }

    /// Ciphertext length is always plaintext length plus the tag.
    #[test]
    fn sealed_length_is_plaintext_plus_tag(
        plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let key = KeyMaterial::new(PROP_KEY);
        let sealed = encrypt(&plaintext, &key).expect("encrypt should succeed");
        prop_assert_eq!(sealed.data.len(), plaintext.len() + TAG_LEN);
    }
}
