//! Time-of-day switching (lights, CO2, feeding pauses).
//!
//! Up to [`MAX_CLOCK_TIMERS`] independent timers, each driving one
//! actuator through up to [`WINDOWS_PER_TIMER`] daily on-windows on the
//! weekdays selected by a bitmask.

use serde::{Deserialize, Serialize};

use super::{ControlContext, Controller, ControllerKind, RunStatus};
use crate::app::ports::TimeOfDay;
use crate::error::CodecError;
use crate::registry::SlotId;

pub const MAX_CLOCK_TIMERS: usize = 4;
pub const WINDOWS_PER_TIMER: usize = 4;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Every day of the week.
pub const ALL_WEEKDAYS: u8 = 0x7F;

/// Half-open `[start, end)` interval in minutes since midnight.  A window
/// with `start > end` wraps past midnight; `start == end` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    start: u16,
    end: u16,
}

impl TimeWindow {
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    /// `None` if either bound is not a valid time of day.
    pub fn new(start_hour: u8, start_minute: u8, end_hour: u8, end_minute: u8) -> Option<Self> {
        Some(Self {
            start: minute_of_day(start_hour, start_minute)?,
            end: minute_of_day(end_hour, end_minute)?,
        })
    }

    pub fn start(self) -> u16 {
        self.start
    }

    pub fn end(self) -> u16 {
        self.end
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, minute: u16) -> bool {
        if self.start <= self.end {
            self.start <= minute && minute < self.end
        } else {
            minute >= self.start || minute < self.end
        }
    }

    fn is_valid(self) -> bool {
        self.start < MINUTES_PER_DAY && self.end < MINUTES_PER_DAY
    }
}

fn minute_of_day(hour: u8, minute: u8) -> Option<u16> {
    (hour < 24 && minute < 60).then(|| u16::from(hour) * 60 + u16::from(minute))
}

/// One switching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTimer {
    actuator: SlotId,
    /// Bit 0 = Monday … bit 6 = Sunday.
    weekdays: u8,
    windows: [TimeWindow; WINDOWS_PER_TIMER],
    active: bool,
}

impl ClockTimer {
    pub const fn new() -> Self {
        Self {
            actuator: SlotId::UNASSIGNED,
            weekdays: ALL_WEEKDAYS,
            windows: [TimeWindow::EMPTY; WINDOWS_PER_TIMER],
            active: false,
        }
    }

    pub fn actuator(&self) -> SlotId {
        self.actuator
    }

    pub fn set_actuator(&mut self, actuator: SlotId) {
        self.actuator = actuator;
    }

    pub fn weekdays(&self) -> u8 {
        self.weekdays
    }

    pub fn set_weekdays(&mut self, mask: u8) {
        self.weekdays = mask & ALL_WEEKDAYS;
    }

    pub fn window(&self, idx: usize) -> Option<TimeWindow> {
        self.windows.get(idx).copied()
    }

    /// Replace window `idx`.  Returns `false` if `idx` is out of range.
    pub fn set_window(&mut self, idx: usize, window: TimeWindow) -> bool {
        match self.windows.get_mut(idx) {
            Some(w) => {
                *w = window;
                true
            }
            None => false,
        }
    }

    /// Latched output state from the last evaluation.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the rule wants its actuator on at `now`.
    pub fn wants_on(&self, now: TimeOfDay) -> bool {
        let day_bit = 1u8.checked_shl(u32::from(now.weekday)).unwrap_or(0);
        if self.weekdays & day_bit == 0 {
            return false;
        }
        let minute = now.minute_of_day();
        self.windows.iter().any(|w| w.contains(minute))
    }

    fn is_valid(&self) -> bool {
        self.weekdays & !ALL_WEEKDAYS == 0 && self.windows.iter().all(|w| w.is_valid())
    }
}

impl Default for ClockTimer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ClockTimerController {
    timers: [ClockTimer; MAX_CLOCK_TIMERS],
    /// Per timer: the latched flag has been applied to the actuator since
    /// boot or restore.
    applied: [bool; MAX_CLOCK_TIMERS],
}

impl ClockTimerController {
    pub fn new() -> Self {
        Self {
            timers: [ClockTimer::new(); MAX_CLOCK_TIMERS],
            applied: [false; MAX_CLOCK_TIMERS],
        }
    }

    pub fn timer(&self, idx: usize) -> Option<&ClockTimer> {
        self.timers.get(idx)
    }

    pub fn timer_mut(&mut self, idx: usize) -> Option<&mut ClockTimer> {
        let timer = self.timers.get_mut(idx)?;
        self.applied[idx] = false;
        Some(timer)
    }
}

impl Default for ClockTimerController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for ClockTimerController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::ClockTimer
    }

    fn run(&mut self, ctx: &mut ControlContext<'_>) -> RunStatus {
        let Some(now) = ctx.time_of_day() else {
            return RunStatus::Skipped;
        };

        for (timer, applied) in self.timers.iter_mut().zip(self.applied.iter_mut()) {
            if !ctx.has_actuator(timer.actuator) {
                continue;
            }
            let want = timer.wants_on(now);
            if want != timer.active || !*applied {
                *applied = ctx.switch_actuator(timer.actuator, want);
                timer.active = want;
            }
        }
        RunStatus::Ran
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        Ok(postcard::to_slice(&self.timers, buf)?.len())
    }

    fn deserialize(&mut self, buf: &[u8]) -> Result<usize, CodecError> {
        let (timers, rest) = postcard::take_from_bytes::<[ClockTimer; MAX_CLOCK_TIMERS]>(buf)?;
        if !timers.iter().all(ClockTimer::is_valid) {
            return Err(CodecError::Invalid);
        }
        self.timers = timers;
        self.applied = [false; MAX_CLOCK_TIMERS];
        Ok(buf.len() - rest.len())
    }

    fn reset(&mut self) {
        for timer in &mut self.timers {
            timer.active = false;
        }
        self.applied = [false; MAX_CLOCK_TIMERS];
    }
}
