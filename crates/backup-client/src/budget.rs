//! Wall-clock budget for the monitor loop

use crate::config::TICKS_PER_MINUTE;

/// Countdown of poll ticks with a derived minutes display
///
/// The tick countdown starts at `minutes * 12` and the minutes display drops
/// by one every 12 ticks, so both reach zero on the same tick. Neither value
/// ever increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    minutes: u64,
    ticks_left: u64,
    minutes_left: u64,
}

impl TimeoutBudget {
    pub fn new(minutes: u64) -> Self {
        Self {
            minutes,
            ticks_left: minutes.saturating_mul(TICKS_PER_MINUTE),
            minutes_left: minutes,
        }
    }

    /// Budget the loop started with
    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    /// Poll ticks remaining
    pub fn ticks_left(&self) -> u64 {
        self.ticks_left
    }

    /// Whole minutes remaining, for display
    pub fn minutes_left(&self) -> u64 {
        self.minutes_left
    }

    pub fn is_exhausted(&self) -> bool {
        self.ticks_left == 0
    }

    /// Consume one poll interval
    pub fn tick(&mut self) {
        if self.ticks_left == 0 {
            return;
        }
        self.ticks_left -= 1;
        if self.ticks_left % TICKS_PER_MINUTE == 0 {
            self.minutes_left = self.minutes_left.saturating_sub(1);
        }
    }
}
