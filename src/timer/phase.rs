//! Phase state machine
//!
//! Pure transition rules between work and break phases. Nothing here locks
//! or sleeps; `TimerEngine` wraps a `TimerState` in its mutex and calls these
//! methods from inside its critical sections.
//!
//! ```text
//! Work --(count < interval)--> ShortBreak --> Work
//! Work --(count = interval)--> LongBreak  --> Work
//! ```

use super::{DurationUpdate, Durations, Phase, TimerSnapshot};

/// Mutable timer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    phase: Phase,
    /// Work phases completed since the last long break
    short_break_count: u32,
    remaining_seconds: u64,
    running: bool,
    durations: Durations,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(Durations::default())
    }
}

impl TimerState {
    /// Create a stopped timer at the start of a work phase
    pub fn new(durations: Durations) -> Self {
        Self {
            phase: Phase::Work,
            short_break_count: 0,
            remaining_seconds: durations.seconds_for(Phase::Work),
            running: false,
            durations,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn short_break_count(&self) -> u32 {
        self.short_break_count
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    /// Configured length of the current phase in minutes
    pub fn current_duration_minutes(&self) -> u32 {
        self.durations.minutes_for(self.phase)
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Move to the next phase and restart its countdown
    ///
    /// Leaves `running` untouched.
    pub fn advance(&mut self) {
        match self.phase {
            Phase::Work => {
                self.short_break_count += 1;
                if self.short_break_count >= self.durations.break_interval {
                    self.short_break_count = 0;
                    self.enter(Phase::LongBreak);
                } else {
                    self.enter(Phase::ShortBreak);
                }
            }
            Phase::ShortBreak | Phase::LongBreak => self.enter(Phase::Work),
        }
    }

    /// Move to the previous phase and restart its countdown
    ///
    /// Leaving a break always lands on `Work` without touching the count, so
    /// `retreat` only inverts `advance` when starting from `Work`.
    pub fn retreat(&mut self) {
        match self.phase {
            Phase::Work => {
                if self.short_break_count == 0 {
                    self.short_break_count = self.durations.break_interval;
                    self.enter(Phase::LongBreak);
                } else {
                    self.short_break_count -= 1;
                    self.enter(Phase::ShortBreak);
                }
            }
            Phase::ShortBreak | Phase::LongBreak => self.enter(Phase::Work),
        }
    }

    /// Count down one second
    ///
    /// Returns `true` when this tick expired the phase, in which case the
    /// state has already advanced to the next phase.
    pub fn tick(&mut self) -> bool {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Stop and rewind the countdown of the current phase
    pub fn reset(&mut self) {
        self.running = false;
        self.rewind();
    }

    /// Restore the default durations, then `reset`
    pub fn reset_durations(&mut self) {
        self.durations = Durations::default();
        self.reset();
    }

    /// Apply a partial duration change
    ///
    /// A stopped timer picks the new length up immediately; a running
    /// countdown keeps going and the change applies from the next phase.
    pub fn update_durations(&mut self, update: DurationUpdate) {
        if let Some(work) = update.work_minutes {
            self.durations.work_minutes = work;
        }
        if let Some(short_break) = update.short_break_minutes {
            self.durations.short_break_minutes = short_break;
        }
        if let Some(long_break) = update.long_break_minutes {
            self.durations.long_break_minutes = long_break;
        }
        if !self.running {
            self.rewind();
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.phase,
            state_label: self.phase.label().to_string(),
            minutes: self.remaining_seconds / 60,
            seconds: self.remaining_seconds % 60,
            running: self.running,
        }
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.rewind();
    }

    fn rewind(&mut self) {
        self.remaining_seconds = self.durations.seconds_for(self.phase);
    }
}
