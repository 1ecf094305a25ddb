//! PBKDF2-HMAC-SHA256 key derivation.
//!
//! A single passphrase yields two independent 256-bit keys:
//! - the **encryption key**, derived from the manifest's base salt
//! - the **integrity key**, derived from the base salt with every byte
//!   XOR'd with `0x5C`
//!
//! The XOR'd salt is a domain-separation shortcut: it guarantees the two
//! derivation calls never see identical inputs without requiring a second
//! random salt in the manifest. It is NOT a general-purpose key-separation
//! construction — the masked salt stays correlated with the base salt. A
//! future format revision should carry a second independent salt or expand
//! one derivation into two subkeys via HKDF.

use crate::error::CryptoError;
use crate::memory::{KeyMaterial, KEY_LEN};
use std::fmt;
use zeroize::Zeroize;

/// PBKDF2 iteration count — fixed security parameter, not configurable.
///
/// Chosen to push brute-force cost well past the ≥100,000 floor of current
/// guidance while keeping derivation sub-second on commodity hardware.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Required salt length in bytes.
pub const SALT_LEN: usize = 16;

/// XOR mask applied to the base salt for the integrity-key derivation.
const INTEGRITY_SALT_MASK: u8 = 0x5C;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The two keys derived from one passphrase + salt.
pub struct DerivedKeys {
    /// AES-256-GCM key for per-document encryption.
    pub encryption: KeyMaterial,
    /// HMAC-SHA256 key for manifest integrity.
    pub integrity: KeyMaterial,
}

impl fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKeys(***)")
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the encryption and integrity keys from a passphrase and salt.
///
/// Runs PBKDF2-HMAC-SHA256 twice at [`PBKDF2_ITERATIONS`]: once with the
/// base salt, once with the `0x5C`-masked salt. Deliberately slow —
/// callers must keep this off any latency-critical path.
///
/// Neither the passphrase nor any intermediate material is logged or
/// carried in error values.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivation`] if the salt is not exactly
/// [`SALT_LEN`] bytes. The length check runs before any iteration work so
/// a malformed manifest fails fast.
pub fn derive_keys(passphrase: &[u8], salt: &[u8]) -> Result<DerivedKeys, CryptoError> {
    if salt.len() != SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "invalid salt length: {} bytes (expected {SALT_LEN})",
            salt.len()
        )));
    }

    let encryption = derive_one(passphrase, salt);

    let mut integrity_salt = [0u8; SALT_LEN];
    for (dst, src) in integrity_salt.iter_mut().zip(salt.iter()) {
        *dst = src ^ INTEGRITY_SALT_MASK;
    }
    let integrity = derive_one(passphrase, &integrity_salt);
    integrity_salt.zeroize();

    Ok(DerivedKeys {
        encryption,
        integrity,
    })
}

/// One PBKDF2-HMAC-SHA256 pass producing a 256-bit key.
fn derive_one(passphrase: &[u8], salt: &[u8]) -> KeyMaterial {
    let mut output = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(passphrase, salt, PBKDF2_ITERATIONS, &mut output);
    KeyMaterial::new(output)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
