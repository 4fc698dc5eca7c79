#![forbid(unsafe_code)]

//! Arm-on-demand interval timer.
//!
//! [`IntervalTimer`] does not spawn anything; the host's event loop asks it
//! when the next wake-up is due (`deadline`) and reports elapsed time through
//! `poll`. A disarmed timer has no deadline, so an idle host never wakes up
//! for it.
//!
//! # Invariants
//!
//! 1. `deadline()` is `Some` iff the timer is armed.
//! 2. Arming an armed timer keeps the existing deadline.
//! 3. `poll` fires at most once per call and re-schedules one interval after
//!    the polled instant, so a late poll never produces a burst of catch-up
//!    ticks.

use std::time::Duration;

use web_time::Instant;

/// A periodic timer that only runs while armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl IntervalTimer {
    /// Create a disarmed timer with the given period.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Timer period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the timer is armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Next instant the timer fires, if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.next_due
    }

    /// Arm the timer, first firing one interval after `now`.
    ///
    /// Returns `true` if the timer was disarmed before.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.next_due.is_some() {
            return false;
        }
        self.next_due = Some(now + self.interval);
        true
    }

    /// Stop the timer.
    ///
    /// Returns `true` if the timer was armed before.
    pub fn disarm(&mut self) -> bool {
        self.next_due.take().is_some()
    }

    /// Report that time is now `now`. Returns `true` when the timer fires.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn disarmed_timer_never_fires() {
        let start = Instant::now();
        let mut timer = IntervalTimer::new(MS * 100);
        assert!(!timer.is_armed());
        assert_eq!(timer.deadline(), None);
        assert!(!timer.poll(start + MS * 10_000));
    }

    #[test]
    fn fires_after_interval() {
        let start = Instant::now();
        let mut timer = IntervalTimer::new(MS * 100);
        assert!(timer.arm(start));
        assert_eq!(timer.deadline(), Some(start + MS * 100));
        assert!(!timer.poll(start + MS * 99));
        assert!(timer.poll(start + MS * 100));
        assert_eq!(timer.deadline(), Some(start + MS * 200));
    }

    #[test]
    fn rearm_keeps_deadline() {
        let start = Instant::now();
        let mut timer = IntervalTimer::new(MS * 100);
        timer.arm(start);
        assert!(!timer.arm(start + MS * 50));
        assert_eq!(timer.deadline(), Some(start + MS * 100));
    }

    #[test]
    fn late_poll_does_not_burst() {
        let start = Instant::now();
        let mut timer = IntervalTimer::new(MS * 100);
        timer.arm(start);
        assert!(timer.poll(start + MS * 1_000));
        assert!(!timer.poll(start + MS * 1_050));
        assert_eq!(timer.deadline(), Some(start + MS * 1_100));
    }

    #[test]
    fn disarm_clears_deadline() {
        let start = Instant::now();
        let mut timer = IntervalTimer::new(MS * 100);
        timer.arm(start);
        assert!(timer.disarm());
        assert!(!timer.disarm());
        assert!(!timer.poll(start + MS * 500));
    }
}
