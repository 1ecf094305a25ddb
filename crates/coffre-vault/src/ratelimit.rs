//! Progressive-lockout rate limiter for unlock attempts.
//!
//! State machine: `Open` (attempts below threshold) → `Locked(until)`
//! (attempts at or past threshold) → `Open` again once `until` elapses or
//! on a verified success. Expiry only *permits* another attempt — the
//! count stays elevated until a fully successful unlock calls [`reset`].
//!
//! Lockout on the Nth failure at or past the threshold doubles each time:
//! failures 5, 6, 7, 8, 9 yield 15 s, 30 s, 60 s, 120 s, 240 s, then the
//! 300 s cap.
//!
//! The limiter is a plain value owned by the session store — constructed
//! once per process lifetime and injected, never a global. It is not
//! persisted: restarting the process resets it (accepted tradeoff — the
//! manifest is offline-attackable regardless, so the limiter is a brake on
//! interactive guessing, not the security boundary).
//!
//! [`reset`]: RateLimiter::reset

use serde::Serialize;
use std::time::{Duration, Instant};

/// Consecutive failures before the first lockout window.
pub const FAILURE_THRESHOLD: u32 = 5;

/// First lockout window, in seconds.
pub const LOCKOUT_BASE_SECS: u64 = 15;

/// Upper bound on any lockout window, in seconds (5 minutes).
pub const LOCKOUT_CAP_SECS: u64 = 300;

/// Growth factor applied per failure past the threshold.
const LOCKOUT_MULTIPLIER: u64 = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Unlock-attempt tracking state. See the module docs for the machine.
#[derive(Debug)]
pub struct RateLimiter {
    attempts: u32,
    locked_until: Option<Instant>,
    last_attempt: Option<Instant>,
}

/// Read-only limiter status for UIs (countdown display, attempt counter).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterStatus {
    /// Failures since the last success.
    pub attempts: u32,
    /// Whether the gate is currently closed.
    pub locked: bool,
    /// Milliseconds until the gate opens (0 when open).
    pub remaining_ms: u64,
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl RateLimiter {
    /// A fresh limiter: zero attempts, gate open.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attempts: 0,
            locked_until: None,
            last_attempt: None,
        }
    }

    /// Failures recorded since the last success.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Timestamp of the most recent failure, if any.
    #[must_use]
    pub const fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// Record a failed unlock attempt at `now`.
    ///
    /// Called for wrong-passphrase AND integrity failures — the two must
    /// carry the same penalty. At or past the threshold, (re)arms the
    /// lockout window for the duration the current count dictates.
    pub fn record_failure_at(&mut self, now: Instant) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);
        if self.attempts >= FAILURE_THRESHOLD {
            self.locked_until = now.checked_add(lockout_duration(self.attempts));
        }
    }

    /// [`record_failure_at`](Self::record_failure_at) with the current time.
    pub fn record_failure(&mut self) {
        self.record_failure_at(Instant::now());
    }

    /// Clear all state. Called ONLY after a fully verified, fully
    /// decrypted unlock — never on mere window expiry.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.locked_until = None;
        self.last_attempt = None;
    }

    /// Time left in the lockout window at `now`, or `None` when the gate
    /// is open. Pure in `now` — no background timer is needed to enforce
    /// the gate, only to drive a UI countdown.
    #[must_use]
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        let until = self.locked_until?;
        let left = until.checked_duration_since(now)?;
        if left.is_zero() {
            None
        } else {
            Some(left)
        }
    }

    /// [`remaining_at`](Self::remaining_at) with the current time.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining_at(Instant::now())
    }

    /// Whether the gate is closed at `now`.
    #[must_use]
    pub fn is_locked_at(&self, now: Instant) -> bool {
        self.remaining_at(now).is_some()
    }

    /// [`is_locked_at`](Self::is_locked_at) with the current time.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Instant::now())
    }

    /// Snapshot for UI consumption.
    #[must_use]
    pub fn status(&self) -> LimiterStatus {
        let remaining = self.remaining();
        LimiterStatus {
            attempts: self.attempts,
            locked: remaining.is_some(),
            remaining_ms: remaining
                .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lockout window for the given failure count:
/// `base * multiplier^(attempts - threshold)`, capped at
/// [`LOCKOUT_CAP_SECS`].
#[must_use]
pub fn lockout_duration(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(FAILURE_THRESHOLD);
    let secs = LOCKOUT_MULTIPLIER
        .checked_pow(exponent)
        .and_then(|factor| LOCKOUT_BASE_SECS.checked_mul(factor))
        .map_or(LOCKOUT_CAP_SECS, |s| s.min(LOCKOUT_CAP_SECS));
    Duration::from_secs(secs)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_limiter_is_open() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.attempts(), 0);
        assert!(!limiter.is_locked());
        assert!(limiter.remaining().is_none());
    }

    #[test]
    fn below_threshold_stays_open() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..4 {
            limiter.record_failure_at(now);
        }
        assert_eq!(limiter.attempts(), 4);
        assert!(!limiter.is_locked_at(now));
    }

    #[test]
    fn fifth_failure_locks_for_base_window() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..5 {
            limiter.record_failure_at(now);
        }
        let remaining = limiter.remaining_at(now).expect("must be locked");
        assert_eq!(remaining, Duration::from_secs(LOCKOUT_BASE_SECS));
    }

    #[test]
    fn sixth_failure_doubles_the_window() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..6 {
            limiter.record_failure_at(now);
        }
        let remaining = limiter.remaining_at(now).expect("must be locked");
        assert_eq!(remaining, Duration::from_secs(30));
    }

    #[test]
    fn lockout_never_exceeds_cap() {
        assert_eq!(lockout_duration(5), Duration::from_secs(15));
        assert_eq!(lockout_duration(6), Duration::from_secs(30));
        assert_eq!(lockout_duration(7), Duration::from_secs(60));
        assert_eq!(lockout_duration(8), Duration::from_secs(120));
        assert_eq!(lockout_duration(9), Duration::from_secs(240));
        assert_eq!(lockout_duration(10), Duration::from_secs(300));
        assert_eq!(lockout_duration(50), Duration::from_secs(300));
        assert_eq!(lockout_duration(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn expiry_opens_the_gate_but_keeps_the_count() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..5 {
            limiter.record_failure_at(now);
        }
        assert!(limiter.is_locked_at(now));

        // Just past the 15 s window: gate open, count still elevated.
        let later = now + Duration::from_secs(16);
        assert!(!limiter.is_locked_at(later));
        assert_eq!(limiter.attempts(), 5);

        // The next failure locks for the SIXTH window (30 s), not the first.
        limiter.record_failure_at(later);
        assert_eq!(
            limiter.remaining_at(later).expect("locked"),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..8 {
            limiter.record_failure_at(now);
        }
        assert!(limiter.is_locked_at(now));
        limiter.reset();
        assert_eq!(limiter.attempts(), 0);
        assert!(!limiter.is_locked_at(now));
        assert!(limiter.last_attempt().is_none());
    }

    #[test]
    fn remaining_shrinks_with_time() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..5 {
            limiter.record_failure_at(now);
        }
        let at_five = limiter
            .remaining_at(now + Duration::from_secs(5))
            .expect("still locked");
        assert_eq!(at_five, Duration::from_secs(10));
    }

    #[test]
    fn status_reports_locked_state() {
        let mut limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.record_failure();
        }
        let status = limiter.status();
        assert_eq!(status.attempts, 5);
        assert!(status.locked);
        assert!(status.remaining_ms > 0);
        assert!(status.remaining_ms <= 15_000);
    }
}
