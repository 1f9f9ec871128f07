//! Simulated clock for the Smalltown simulation.
//!
//! The clock owns the current [`SimTime`] and a one-based day counter. The
//! day counter is derived from the time whenever the clock moves, so it can
//! never drift from it. [`SimClock::advance`] reports every day boundary it
//! crossed; the scheduler announces each one with a single town event.
//!
//! All arithmetic is checked. Running off the end of representable time is
//! an error, not a wrap.

use std::ops::RangeInclusive;

use smalltown_types::{MS_PER_HOUR, SimTime};

/// Hours in a simulated day.
const HOURS_PER_DAY: u64 = 24;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClockError {
    /// Simulated time would overflow.
    #[error("simulated time overflow: cannot advance {millis}ms past {now}")]
    TimeOverflow {
        /// Time before the failed advance.
        now: SimTime,
        /// Requested step.
        millis: u64,
    },

    /// Invalid clock configuration.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Days entered by a single advance, in order. Empty when no boundary was
/// crossed.
pub type DaysEntered = RangeInclusive<u64>;

/// The town clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimClock {
    /// Where [`reset`](Self::reset) returns to.
    start: SimTime,
    /// Current simulated time.
    now: SimTime,
    /// Current one-based day.
    day: u64,
}

impl SimClock {
    /// A clock at `start_hour` o'clock on day 1.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `start_hour` is 24 or more.
    pub fn new(start_hour: u64) -> Result<Self, ClockError> {
        if start_hour >= HOURS_PER_DAY {
            return Err(ClockError::InvalidConfig {
                reason: format!("start hour must be below 24, got {start_hour}"),
            });
        }
        Ok(Self::starting_at(SimTime(start_hour.saturating_mul(MS_PER_HOUR))))
    }

    /// A clock at an explicit instant.
    pub const fn starting_at(start: SimTime) -> Self {
        Self {
            start,
            now: start,
            day: start.day(),
        }
    }

    /// Current simulated time.
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// Current one-based day.
    pub const fn day(&self) -> u64 {
        self.day
    }

    /// The instant this clock started from.
    pub const fn start(&self) -> SimTime {
        self.start
    }

    /// Move forward by `millis`.
    ///
    /// Returns the days entered, which is empty unless midnight was crossed.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TimeOverflow`] if the new time does not fit.
    pub fn advance(&mut self, millis: u64) -> Result<DaysEntered, ClockError> {
        let next = self
            .now
            .0
            .checked_add(millis)
            .ok_or(ClockError::TimeOverflow {
                now: self.now,
                millis,
            })?;
        let previous_day = self.day;
        self.now = SimTime(next);
        self.day = self.now.day();
        Ok(previous_day.saturating_add(1)..=self.day)
    }

    /// Jump to `time`, realigning the day counter. Used by operators and
    /// tests; jumps never announce days.
    pub const fn set_time(&mut self, time: SimTime) {
        self.now = time;
        self.day = time.day();
    }

    /// Return to the starting instant.
    pub const fn reset(&mut self) {
        self.set_time(self.start);
    }
}
