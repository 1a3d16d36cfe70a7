use std::cell::Cell;
use std::time::{Duration, Instant};

// ── Clocks ─────────────────────────────────────────────

pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock read through tokio, so a paused test runtime controls it too.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Fake clock for tests: time only moves when `advance` is called.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

// ── Debounce Timer ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Pending { due: Instant },
}

/// Single-shot, restartable timer. At most one deadline is outstanding.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    state: TimerState,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: TimerState::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TimerState::Pending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Idle => None,
            TimerState::Pending { due } => Some(due),
        }
    }

    /// Schedule (or reschedule) the deadline at `now + delay`.
    pub fn arm(&mut self, now: Instant) {
        self.state = TimerState::Pending {
            due: now + self.delay,
        };
    }

    /// Drop the outstanding deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.state = TimerState::Idle;
        was_pending
    }

    /// Consume the deadline if it has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Pending { due } if due <= now => {
                self.state = TimerState::Idle;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn rearming_pushes_deadline_back() {
        let clock = ManualClock::new();
        let mut timer = DebounceTimer::new(DELAY);
        timer.arm(clock.now());
        let first = timer.deadline().unwrap();

        clock.advance(Duration::from_millis(200));
        timer.arm(clock.now());
        assert_eq!(timer.deadline(), Some(first + Duration::from_millis(200)));
    }

    #[test]
    fn fires_once_at_deadline() {
        let clock = ManualClock::new();
        let mut timer = DebounceTimer::new(DELAY);
        timer.arm(clock.now());

        clock.advance(Duration::from_millis(299));
        assert!(!timer.fire_if_due(clock.now()));
        clock.advance(Duration::from_millis(1));
        assert!(timer.fire_if_due(clock.now()));
        assert!(!timer.fire_if_due(clock.now()));
        assert!(!timer.is_pending());
    }

    #[test]
    fn cancel_reports_pending() {
        let mut timer = DebounceTimer::new(DELAY);
        assert!(!timer.cancel());
        timer.arm(Instant::now());
        assert!(timer.cancel());
        assert!(timer.deadline().is_none());
    }
}
