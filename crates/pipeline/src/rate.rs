//! Fixed-window delivery rate limiting.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

/// Outcome of a rate-gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Allowed,
    /// Window exhausted; `retry_after` is the time until it resets.
    Exhausted { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter gating delivery attempts.
///
/// A window admits at most `max_per_window` acquisitions; the first
/// acquisition after the window elapses starts a fresh one.
pub struct FixedWindow {
    max_per_window: u32,
    window: Duration,
    state: Mutex<Option<WindowState>>,
}

impl FixedWindow {
    #[must_use]
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            state: Mutex::new(None),
        }
    }

    /// Window of one minute, the configuration's natural unit.
    #[must_use]
    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    pub fn try_acquire(&self) -> Gate {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> Gate {
        if self.max_per_window == 0 {
            return Gate::Exhausted {
                retry_after: self.window,
            };
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.as_mut() {
            Some(current) => {
                let elapsed = now.duration_since(current.started_at);
                if elapsed >= self.window {
                    current.started_at = now;
                    current.count = 1;
                    Gate::Allowed
                } else if current.count < self.max_per_window {
                    current.count += 1;
                    Gate::Allowed
                } else {
                    Gate::Exhausted {
                        retry_after: self.window.saturating_sub(elapsed),
                    }
                }
            },
            None => {
                *state = Some(WindowState {
                    started_at: now,
                    count: 1,
                });
                Gate::Allowed
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit() {
        let window = FixedWindow::new(2, Duration::from_secs(10));
        let now = Instant::now();

        assert_eq!(window.try_acquire_at(now), Gate::Allowed);
        assert_eq!(window.try_acquire_at(now), Gate::Allowed);

        match window.try_acquire_at(now) {
            Gate::Exhausted { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(10));
            },
            Gate::Allowed => panic!("expected third acquisition to be denied"),
        }
    }

    #[test]
    fn window_resets_after_elapse() {
        let window = FixedWindow::new(1, Duration::from_secs(10));
        let now = Instant::now();

        assert_eq!(window.try_acquire_at(now), Gate::Allowed);
        assert!(matches!(
            window.try_acquire_at(now + Duration::from_secs(1)),
            Gate::Exhausted { .. }
        ));
        assert_eq!(
            window.try_acquire_at(now + Duration::from_secs(11)),
            Gate::Allowed
        );
    }

    #[test]
    fn retry_after_shrinks_as_window_ages() {
        let window = FixedWindow::new(1, Duration::from_secs(10));
        let now = Instant::now();

        window.try_acquire_at(now);
        let Gate::Exhausted { retry_after } = window.try_acquire_at(now + Duration::from_secs(4))
        else {
            panic!("expected denial");
        };
        assert_eq!(retry_after, Duration::from_secs(6));
    }

    #[test]
    fn zero_limit_always_denies() {
        let window = FixedWindow::new(0, Duration::from_secs(10));
        assert!(matches!(window.try_acquire(), Gate::Exhausted { .. }));
    }
}
