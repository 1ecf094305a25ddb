//! Secure memory types for key material and decrypted document bodies.
//!
//! Everything secret in Coffre lives in one of two wrappers:
//! - [`KeyMaterial`] — a fixed 256-bit key (AES or HMAC), zeroized on drop
//! - [`SecretBuffer`] — a variable-length buffer for decrypted plaintext
//!
//! Both mask their `Debug`/`Display` output and lock their pages in RAM
//! via `mlock` where the platform allows it, so cleartext never reaches
//! swap. [`disable_core_dumps`] closes the remaining on-disk leak path.

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of every symmetric key in Coffre, in bytes (256 bits).
pub const KEY_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Page locking
// ---------------------------------------------------------------------------

/// RAII guard over an `mlock`'d memory region; `munlock`s on drop.
///
/// Locking is best-effort: if `mlock` fails (quota, privileges) the region
/// simply stays swappable and a one-time warning is printed. Zeroization on
/// drop is independent of lock status.
pub(crate) struct LockedRegion {
    ptr: *const u8,
    len: usize,
    locked: bool,
}

// SAFETY: the pointer is only handed to mlock/munlock, which are
// thread-safe; the pointed-to bytes are owned and accessed solely by the
// wrapping SecretBuffer/KeyMaterial.
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

impl LockedRegion {
    pub(crate) fn try_lock(ptr: *const u8, len: usize) -> Self {
        let locked = platform::try_mlock(ptr, len);
        if !locked && len > 0 {
            static WARNED: std::sync::Once = std::sync::Once::new();
            WARNED.call_once(|| {
                eprintln!(
                    "[coffre-crypto-core] WARNING: mlock failed — \
                     decrypted material may be swapped to disk."
                );
            });
        }
        Self { ptr, len, locked }
    }

    pub(crate) const fn unlocked() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
            locked: false,
        }
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        if self.locked {
            platform::try_munlock(self.ptr, self.len);
        }
    }
}

// ---------------------------------------------------------------------------
// KeyMaterial — fixed 256-bit keys
// ---------------------------------------------------------------------------

/// A 256-bit symmetric key, zeroized on drop.
///
/// The input array is moved in, so no unzeroized copy outlives the caller's
/// stack frame. `mlock` is attempted at the struct's resting address; if the
/// value is later moved the stale lock is released harmlessly on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
    #[zeroize(skip)]
    lock: LockedRegion,
}

impl KeyMaterial {
    /// Wrap a raw 32-byte key.
    #[must_use]
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        let mut key = Self {
            bytes,
            lock: LockedRegion::unlocked(),
        };
        key.lock = LockedRegion::try_lock(key.bytes.as_ptr(), KEY_LEN);
        key
    }

    /// Expose the raw key bytes for a cryptographic operation.
    ///
    /// Keep the borrow short-lived — pass it straight into the primitive
    /// rather than binding it to a long-lived variable.
    #[must_use]
    pub const fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(***)")
    }
}

impl fmt::Display for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(***)")
    }
}

impl From<[u8; KEY_LEN]> for KeyMaterial {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self::new(bytes)
    }
}

// ---------------------------------------------------------------------------
// SecretBuffer — variable-length plaintext
// ---------------------------------------------------------------------------

/// Variable-length buffer for decrypted document bodies.
///
/// Wraps [`SecretSlice<u8>`] from the `secrecy` crate (zeroize on drop) and
/// adds page locking plus masked `Debug`/`Display`. This is the only type
/// the session layer is allowed to hold cleartext in.
pub struct SecretBuffer {
    inner: SecretSlice<u8>,
    lock: LockedRegion,
}

impl SecretBuffer {
    /// Copy `data` into a fresh locked allocation.
    ///
    /// The caller should zeroize its own copy of `data` afterwards.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        let inner: SecretSlice<u8> = data.to_vec().into();
        let exposed = inner.expose_secret();
        let lock = LockedRegion::try_lock(exposed.as_ptr(), exposed.len());
        Self { inner, lock }
    }

    /// Take ownership of an existing buffer, leaving no copy behind.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        let inner: SecretSlice<u8> = data.into();
        let exposed = inner.expose_secret();
        let lock = LockedRegion::try_lock(exposed.as_ptr(), exposed.len());
        Self { inner, lock }
    }

    /// Expose the cleartext bytes. Use sparingly.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// `true` if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

// ---------------------------------------------------------------------------
// Random fill + core dumps
// ---------------------------------------------------------------------------

/// Fill `out` with bytes from the OS CSPRNG.
///
/// Used for salts and nonces — values that are public once authored but
/// whose unpredictability is a security precondition.
pub fn fill_random(out: &mut [u8]) {
    OsRng.fill_bytes(out);
}

/// Disable core dumps for the current process.
///
/// On Unix: sets `RLIMIT_CORE` to 0 (soft and hard). On other platforms
/// this is a no-op. Call once at startup, before any unlock attempt.
///
/// # Errors
///
/// Returns an explanatory message if the `setrlimit` call fails; the
/// caller decides whether that is fatal.
pub fn disable_core_dumps() -> Result<(), String> {
    platform::disable_core_dumps_impl()
}

// ---------------------------------------------------------------------------
// Platform-specific implementations
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod platform {
    pub(super) fn try_mlock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock accepts any valid pointer/length pair; failure is
        // reported via the return code and handled by the caller.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn try_munlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: munlock is safe to call; failure is non-critical.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }

    pub(super) fn disable_core_dumps_impl() -> Result<(), String> {
        let limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit with RLIMIT_CORE is a standard POSIX call.
        let ret = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &raw const limit) };
        if ret == 0 {
            Ok(())
        } else {
            Err("failed to disable core dumps via RLIMIT_CORE".into())
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub(super) fn try_mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn try_munlock(_ptr: *const u8, _len: usize) {}

    pub(super) fn disable_core_dumps_impl() -> Result<(), String> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
