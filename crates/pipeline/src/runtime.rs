//! Process-wide runtime state: pause flag, readiness, outcome counters.
//!
//! One instance lives behind a single `Arc` shared by the pipeline, the
//! admin control plane, and the health surface. Counters are atomics so
//! concurrent workers never contend on a lock for bookkeeping.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct RuntimeState {
    paused: AtomicBool,
    ready: AtomicBool,
    forwarded: AtomicU64,
    duplicates_blocked: AtomicU64,
    skipped: AtomicU64,
    rate_limited: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of the runtime state for `stats()` and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub paused: bool,
    pub forwarded: u64,
    pub duplicates_blocked: u64,
    pub skipped: u64,
    pub rate_limited: u64,
    pub errors: u64,
}

impl RuntimeState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Mark initialization complete; flips the health probe to passing.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn note_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_duplicate_blocked(&self) {
        self.duplicates_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            paused: self.is_paused(),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            duplicates_blocked: self.duplicates_blocked.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_and_not_ready() {
        let state = RuntimeState::new();
        assert!(!state.is_paused());
        assert!(!state.is_ready());
    }

    #[test]
    fn pause_resume_round_trip() {
        let state = RuntimeState::new();
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn counters_land_in_snapshot() {
        let state = RuntimeState::new();
        state.note_forwarded();
        state.note_forwarded();
        state.note_duplicate_blocked();
        state.note_rate_limited();
        state.note_error();
        state.note_skipped();

        let snap = state.snapshot();
        assert_eq!(snap.forwarded, 2);
        assert_eq!(snap.duplicates_blocked, 1);
        assert_eq!(snap.rate_limited, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.skipped, 1);
        assert!(!snap.paused);
    }
}
