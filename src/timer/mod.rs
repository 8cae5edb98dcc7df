//! Interval timer module
//!
//! This module provides the work/break interval timer:
//! - `Phase` and `Durations`, the configuration of a cycle
//! - `TimerState`, the pure phase state machine
//! - `TimerEngine`, the shared, lock-protected timer with its background ticker

pub mod engine;
pub mod phase;

pub use engine::TimerEngine;
pub use phase::TimerState;

use serde::{Deserialize, Serialize};

/// Default work phase length in minutes
pub const DEFAULT_WORK_MINUTES: u32 = 25;

/// Default short break length in minutes
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;

/// Default long break length in minutes
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;

/// Default number of work phases before a long break
pub const DEFAULT_BREAK_INTERVAL: u32 = 4;

/// Countdown mode of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Focused work
    #[serde(rename = "Work")]
    Work,
    /// Break between two work phases
    #[serde(rename = "smallBreak")]
    ShortBreak,
    /// Break inserted every `break_interval` work phases
    #[serde(rename = "longBreak")]
    LongBreak,
}

impl Phase {
    /// Wire name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::ShortBreak => "smallBreak",
            Phase::LongBreak => "longBreak",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::ShortBreak => "Small Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

/// Configured phase lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    /// Completed work phases before a long break
    pub break_interval: u32,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
            break_interval: DEFAULT_BREAK_INTERVAL,
        }
    }
}

impl Durations {
    /// Length of the given phase in minutes
    pub fn minutes_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        }
    }

    /// Length of the given phase in seconds
    pub fn seconds_for(&self, phase: Phase) -> u64 {
        u64::from(self.minutes_for(phase)) * 60
    }

    /// Check that every length and the break interval are positive
    pub fn is_valid(&self) -> bool {
        self.work_minutes > 0
            && self.short_break_minutes > 0
            && self.long_break_minutes > 0
            && self.break_interval > 0
    }
}

/// Partial duration change; `None` leaves the current value alone
///
/// The break interval is deliberately absent: it only changes through a
/// full reset to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationUpdate {
    pub work_minutes: Option<u32>,
    pub short_break_minutes: Option<u32>,
    pub long_break_minutes: Option<u32>,
}

/// Lock-consistent, read-only view of the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Current phase
    pub state: Phase,
    /// Display label of the phase
    pub state_label: String,
    /// Whole minutes remaining
    pub minutes: u64,
    /// Seconds remaining past the whole minutes
    pub seconds: u64,
    /// Whether the countdown is ticking
    pub running: bool,
}

impl TimerSnapshot {
    /// Total seconds remaining
    pub fn remaining_seconds(&self) -> u64 {
        self.minutes * 60 + self.seconds
    }
}
