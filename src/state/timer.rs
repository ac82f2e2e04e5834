//! Timers scoped to a single state instance.
//!
//! Each state owns one [`TimerSet`]. The manager advances it on the host's
//! schedule and clears it whenever the state becomes inactive, so a state
//! never sees a timer it set during an earlier activation.

use serde::{Deserialize, Serialize};

/// Handle to a timer set through a [`StateContext`](super::StateContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    remaining: f32,
    interval: f32,
    looping: bool,
}

/// Outstanding timers of one state.
#[derive(Debug, Default)]
pub struct TimerSet {
    timers: Vec<Timer>,
    /// Timers that came due in the last advance and are not dispatched yet
    due: Vec<TimerHandle>,
    next_id: u64,
}

impl TimerSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer `delay` seconds from now.
    ///
    /// Looping timers re-arm with the same delay each time they fire.
    /// Negative delays are treated as zero.
    pub fn set(&mut self, delay: f32, looping: bool) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let delay = delay.max(0.0);
        self.timers.push(Timer {
            handle,
            remaining: delay,
            interval: delay,
            looping,
        });
        handle
    }

    /// Cancel one timer. Returns true if it was pending or due.
    pub fn clear(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len() + self.due.len();
        self.timers.retain(|t| t.handle != handle);
        self.due.retain(|h| *h != handle);
        before != self.timers.len() + self.due.len()
    }

    /// Cancel everything. Returns the number of timers dropped.
    pub fn clear_all(&mut self) -> usize {
        let dropped = self.timers.len()
            + self
                .due
                .iter()
                .filter(|h| !self.is_pending(**h))
                .count();
        self.timers.clear();
        self.due.clear();
        dropped
    }

    /// Check if a timer is still scheduled.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    /// Seconds until a pending timer fires.
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.timers
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| t.remaining.max(0.0))
    }

    /// Number of scheduled timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Check if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advance all timers by `delta_time` seconds.
    ///
    /// Returns the timers that came due, in scheduling order. They stay
    /// claimable through [`take_due`](Self::take_due) until dispatched or
    /// cleared.
    pub fn advance(&mut self, delta_time: f32) -> Vec<TimerHandle> {
        debug_assert!(
            delta_time >= 0.0,
            "timers advanced by {delta_time}, expected a non-negative delta"
        );

        let mut fired = Vec::new();

        for timer in &mut self.timers {
            timer.remaining -= delta_time;
            if timer.remaining <= 0.0 {
                fired.push(timer.handle);
                if timer.looping {
                    timer.remaining += timer.interval;
                    if timer.remaining <= 0.0 {
                        timer.remaining = timer.interval;
                    }
                }
            }
        }

        self.timers.retain(|t| t.looping || !fired.contains(&t.handle));
        self.due.extend(fired.iter().copied());
        fired
    }

    /// Claim a due timer for dispatch.
    ///
    /// Returns false if the timer was cleared after it came due.
    pub fn take_due(&mut self, handle: TimerHandle) -> bool {
        match self.due.iter().position(|h| *h == handle) {
            Some(pos) => {
                self.due.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_fires_once() {
        let mut timers = TimerSet::new();
        let h = timers.set(1.0, false);

        assert!(timers.advance(0.5).is_empty());
        assert!(timers.is_pending(h));
        assert_eq!(timers.remaining(h), Some(0.5));

        assert_eq!(timers.advance(0.5), vec![h]);
        assert!(!timers.is_pending(h));
        assert!(timers.take_due(h));
        assert!(!timers.take_due(h));

        assert!(timers.advance(10.0).is_empty());
    }

    #[test]
    fn test_looping_rearms() {
        let mut timers = TimerSet::new();
        let h = timers.set(1.0, true);

        assert_eq!(timers.advance(1.0), vec![h]);
        assert!(timers.is_pending(h));
        assert_eq!(timers.remaining(h), Some(1.0));

        // Large step still fires once per advance
        assert_eq!(timers.advance(5.0), vec![h]);
        assert!(timers.is_pending(h));
    }

    #[test]
    fn test_clear_before_dispatch() {
        let mut timers = TimerSet::new();
        let a = timers.set(0.0, false);
        let b = timers.set(0.0, false);

        assert_eq!(timers.advance(0.1), vec![a, b]);
        assert!(timers.clear(b));
        assert!(timers.take_due(a));
        assert!(!timers.take_due(b));
    }

    #[test]
    fn test_clear_all() {
        let mut timers = TimerSet::new();
        timers.set(1.0, false);
        timers.set(2.0, true);
        let due = timers.set(0.0, false);
        timers.advance(0.0);

        assert_eq!(timers.clear_all(), 3);
        assert!(timers.is_empty());
        assert!(!timers.take_due(due));
    }

    #[test]
    fn test_negative_delay_is_immediate() {
        let mut timers = TimerSet::new();
        let h = timers.set(-3.0, false);
        assert_eq!(timers.remaining(h), Some(0.0));
        assert_eq!(timers.advance(0.0), vec![h]);
    }

    #[test]
    #[should_panic(expected = "expected a non-negative delta")]
    fn test_negative_advance_is_rejected() {
        let mut timers = TimerSet::new();
        timers.set(1.0, false);
        timers.advance(-0.5);
    }

    #[test]
    #[should_panic(expected = "expected a non-negative delta")]
    fn test_nan_advance_is_rejected() {
        let mut timers = TimerSet::new();
        timers.set(1.0, false);
        timers.advance(f32::NAN);
    }
}
