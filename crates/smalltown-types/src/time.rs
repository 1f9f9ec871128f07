//! Simulated time.
//!
//! The town runs on its own clock, measured in milliseconds since midnight
//! of day 1. Wall-clock time never enters the simulation state; it is only
//! used by the scheduler to pace ticks and by status queries for uptime.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Milliseconds in one simulated second.
pub const MS_PER_SECOND: u64 = 1_000;

/// Milliseconds in one simulated hour.
pub const MS_PER_HOUR: u64 = 3_600 * MS_PER_SECOND;

/// Milliseconds in one simulated day (86 400 simulated seconds).
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// A point on the simulated timeline.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct SimTime(pub u64);

impl SimTime {
    /// Midnight of day 1.
    pub const ZERO: Self = Self(0);

    /// Construct from whole simulated seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(MS_PER_SECOND))
    }

    /// Construct from an hour-of-day on day 1.
    pub const fn from_hours(hours: u64) -> Self {
        Self(hours.saturating_mul(MS_PER_HOUR))
    }

    /// Raw milliseconds since midnight of day 1.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Whole simulated seconds since midnight of day 1.
    pub const fn as_secs(self) -> u64 {
        self.0 / MS_PER_SECOND
    }

    /// Advance by `millis`, saturating at the end of representable time.
    #[must_use]
    pub const fn plus_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Milliseconds elapsed from `earlier` to `self` (zero if `earlier` is later).
    pub const fn millis_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// One-based day number this instant falls on.
    pub const fn day(self) -> u64 {
        (self.0 / MS_PER_DAY).saturating_add(1)
    }

    /// Hour of the day (0..24).
    pub const fn hour(self) -> u64 {
        (self.0 % MS_PER_DAY) / MS_PER_HOUR
    }

    /// Minute of the hour (0..60).
    pub const fn minute(self) -> u64 {
        (self.0 % MS_PER_HOUR) / (60 * MS_PER_SECOND)
    }

    /// Time-of-day band for prompts and status displays.
    pub const fn time_of_day(self) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour())
    }

    /// Render as `HH:MM`.
    pub fn formatted(self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }
}

impl core::fmt::Display for SimTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "day {} {:02}:{:02}", self.day(), self.hour(), self.minute())
    }
}

/// Coarse band of the day used in prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// 05:00 to 08:00.
    EarlyMorning,
    /// 08:00 to 11:00.
    Morning,
    /// 11:00 to 13:00.
    Noon,
    /// 13:00 to 17:00.
    Afternoon,
    /// 17:00 to 19:00.
    Evening,
    /// 19:00 to 22:00.
    Night,
    /// 22:00 to 05:00.
    LateNight,
}

impl TimeOfDay {
    /// Classify an hour of the day (values past 23 wrap around).
    pub const fn from_hour(hour: u64) -> Self {
        match hour % 24 {
            5..=7 => Self::EarlyMorning,
            8..=10 => Self::Morning,
            11..=12 => Self::Noon,
            13..=16 => Self::Afternoon,
            17..=18 => Self::Evening,
            19..=21 => Self::Night,
            _ => Self::LateNight,
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::EarlyMorning => "early morning",
            Self::Morning => "morning",
            Self::Noon => "noon",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
            Self::LateNight => "late night",
        }
    }
}

impl core::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
