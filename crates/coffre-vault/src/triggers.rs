//! Idle/panic trigger wiring — the external signals that invoke wipe.
//!
//! The session store never watches the clock itself; these collaborators
//! do, at the boundary:
//!
//! - [`AutoLockTimer`] + [`spawn_auto_lock`] — inactivity countdown, reset
//!   by any user input the embedder forwards via
//!   [`AutoLockTimer::record_activity`]
//! - [`panic_wipe`] — the panic gesture; the embedder must capture the key
//!   combination BEFORE its normal input handling so nothing can swallow it
//! - [`on_unload`] — best-effort last action at process/view teardown
//! - [`note_hidden`] — visibility change; records a timestamp only

use crate::session::{lock_store, LockReason, SharedSession};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Default inactivity timeout in minutes.
pub const DEFAULT_INACTIVITY_TIMEOUT_MINUTES: u32 = 15;

/// Auto-lock watcher poll interval in seconds.
pub const TIMER_CHECK_INTERVAL_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// AutoLockTimer
// ---------------------------------------------------------------------------

/// Inactivity countdown — any forwarded user input resets it.
///
/// The timer only drives the watcher thread; the lockout *gate* on unlock
/// attempts is the rate limiter's job, not this one's.
pub struct AutoLockTimer {
    /// Last user activity (pointer, key, scroll, touch — whatever the
    /// embedder forwards).
    last_activity: Mutex<Instant>,
    /// Inactivity timeout in minutes.
    timeout_minutes: u32,
    /// Signals the watcher thread to stop.
    cancel: AtomicBool,
}

impl AutoLockTimer {
    /// A timer starting now.
    #[must_use]
    pub fn new(timeout_minutes: u32) -> Self {
        Self {
            last_activity: Mutex::new(Instant::now()),
            timeout_minutes,
            cancel: AtomicBool::new(false),
        }
    }

    /// Record user activity, resetting the countdown.
    pub fn record_activity(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    /// Whether the inactivity timeout has elapsed.
    #[must_use]
    pub fn is_inactivity_expired(&self) -> bool {
        let timeout_secs = u64::from(self.timeout_minutes).saturating_mul(60);
        self.last_activity
            .lock()
            .is_ok_and(|last| last.elapsed().as_secs() >= timeout_secs)
    }

    /// Signal the watcher thread to stop.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Trigger entry points
// ---------------------------------------------------------------------------

/// Spawn the auto-lock watcher thread.
///
/// Polls every [`TIMER_CHECK_INTERVAL_SECS`] and wipes the session with
/// [`LockReason::IdleTimeout`] when the countdown elapses. The thread
/// exits after firing once or when the timer is cancelled; spawn a fresh
/// timer + watcher per unlocked session, cancel it on lock.
pub fn spawn_auto_lock(session: SharedSession, timer: Arc<AutoLockTimer>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(TIMER_CHECK_INTERVAL_SECS));
        if timer.is_cancelled() {
            break;
        }
        if timer.is_inactivity_expired() {
            lock_store(&session).wipe_with_reason(LockReason::IdleTimeout);
            break;
        }
    })
}

/// The panic gesture fired — wipe immediately.
pub fn panic_wipe(session: &SharedSession) {
    lock_store(session).wipe_with_reason(LockReason::PanicKey);
}

/// Process/view teardown — wipe as a best-effort last action.
pub fn on_unload(session: &SharedSession) {
    lock_store(session).wipe_with_reason(LockReason::Unload);
}

/// The view was hidden — record the timestamp, do not wipe.
pub fn note_hidden(session: &SharedSession) {
    lock_store(session).note_hidden();
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
