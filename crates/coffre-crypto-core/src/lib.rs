//! `coffre-crypto-core` — Pure cryptographic primitives for Coffre.
//!
//! This crate is the audit target: zero I/O beyond the OS CSPRNG, zero
//! async, zero knowledge of the manifest format. The vault layer owns
//! parsing and orchestration; this crate owns keys, ciphertext, and digests.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod symmetric;

pub mod integrity;

pub use error::CryptoError;
pub use integrity::{sign, verify, DIGEST_LEN};
pub use kdf::{derive_keys, DerivedKeys, PBKDF2_ITERATIONS, SALT_LEN};
pub use memory::{disable_core_dumps, KeyMaterial, SecretBuffer, KEY_LEN};
pub use symmetric::{decrypt, encrypt, SealedDocument, NONCE_LEN, TAG_LEN};
