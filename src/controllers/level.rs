//! Auto top-off: refill the tank when a float switch reports low water.
//!
//! A reading above zero means the switch is HIGH (water below the mark).
//! Every actuator assigned to this controller is driven as one refill
//! group, found through the assignment index.
//!
//! ```text
//!        HIGH              HIGH > delay_high
//!   Ok ───────▶ Debounce ───────────────────▶ Refill ──── HIGH > timeout ───▶ RefillTimeout
//!   ▲              │ LOW                      │   ▲                            (latched)
//!   │◀─────────────┘                      LOW │   │ HIGH
//!   │                                         ▼   │
//!   └──────────── LOW > delay_low ─────────── Overrun
//! ```
//!
//! Waves shorter than `delay_high` never start a refill.  `delay_low`
//! keeps the pump running a little past the mark.  A refill that does
//! not finish within `timeout` means the reservoir is empty; the
//! controller then stops and stays stopped until [`Controller::reset`].

use serde::{Deserialize, Serialize};

use super::{ControlContext, Controller, ControllerKind, RunStatus, within};
use crate::error::CodecError;
use crate::registry::SlotId;
use crate::sensors::MAX_SENSORS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelState {
    #[default]
    Ok,
    Debounce,
    Refill,
    Overrun,
    RefillTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LevelRecord {
    sensor: SlotId,
    delay_low: u16,
    delay_high: u16,
    timeout: u16,
}

pub struct LevelController {
    sensor: SlotId,
    /// Seconds LOW before the refill stops.
    delay_low: u16,
    /// Seconds HIGH before a refill starts.
    delay_high: u16,
    /// Seconds a refill may take.
    timeout: u16,
    state: LevelState,
    since_ms: u64,
}

impl LevelController {
    pub fn new() -> Self {
        Self {
            sensor: SlotId::UNASSIGNED,
            delay_low: 10,
            delay_high: 3,
            timeout: 30,
            state: LevelState::Ok,
            since_ms: 0,
        }
    }

    pub fn sensor(&self) -> SlotId {
        self.sensor
    }

    pub fn assign_sensor(&mut self, sensor: SlotId) {
        self.sensor = sensor;
    }

    pub fn delay_low(&self) -> u16 {
        self.delay_low
    }

    pub fn set_delay_low(&mut self, secs: u16) {
        self.delay_low = secs;
    }

    pub fn delay_high(&self) -> u16 {
        self.delay_high
    }

    pub fn set_delay_high(&mut self, secs: u16) {
        self.delay_high = secs;
    }

    pub fn timeout(&self) -> u16 {
        self.timeout
    }

    pub fn set_timeout(&mut self, secs: u16) {
        self.timeout = secs;
    }

    pub fn state(&self) -> LevelState {
        self.state
    }
}

impl Default for LevelController {
    fn default() -> Self {
        Self::new()
    }
}

fn secs_to_ms(secs: u16) -> u64 {
    u64::from(secs) * 1000
}

impl Controller for LevelController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Level
    }

    fn run(&mut self, ctx: &mut ControlContext<'_>) -> RunStatus {
        if self.state == LevelState::RefillTimeout {
            return RunStatus::Latched;
        }
        let Some(reading) = ctx.reading(self.sensor) else {
            return RunStatus::Skipped;
        };

        let high = reading > 0.0;
        let now = ctx.uptime_ms();
        let elapsed = now.wrapping_sub(self.since_ms);

        match self.state {
            LevelState::Ok => {
                ctx.switch_assigned(false);
                if high {
                    self.state = LevelState::Debounce;
                    self.since_ms = now;
                }
            }
            LevelState::Debounce => {
                if !high {
                    self.state = LevelState::Ok;
                } else if elapsed > secs_to_ms(self.delay_high) {
                    ctx.switch_assigned(true);
                    self.state = LevelState::Refill;
                    self.since_ms = now;
                }
            }
            LevelState::Refill => {
                if !high {
                    self.state = LevelState::Overrun;
                    self.since_ms = now;
                } else if elapsed > secs_to_ms(self.timeout) {
                    log::warn!("Refill timed out after {} s; reservoir empty?", self.timeout);
                    ctx.switch_assigned(false);
                    self.state = LevelState::RefillTimeout;
                }
            }
            LevelState::Overrun => {
                if high {
                    self.state = LevelState::Refill;
                } else if elapsed > secs_to_ms(self.delay_low) {
                    ctx.switch_assigned(false);
                    self.state = LevelState::Ok;
                }
            }
            LevelState::RefillTimeout => return RunStatus::Latched,
        }
        RunStatus::Ran
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let record = LevelRecord {
            sensor: self.sensor,
            delay_low: self.delay_low,
            delay_high: self.delay_high,
            timeout: self.timeout,
        };
        Ok(postcard::to_slice(&record, buf)?.len())
    }

    fn deserialize(&mut self, buf: &[u8]) -> Result<usize, CodecError> {
        let (record, rest) = postcard::take_from_bytes::<LevelRecord>(buf)?;
        self.sensor = within(record.sensor, MAX_SENSORS);
        self.delay_low = record.delay_low;
        self.delay_high = record.delay_high;
        self.timeout = record.timeout;
        Ok(buf.len() - rest.len())
    }

    fn reset(&mut self) {
        self.state = LevelState::Ok;
        self.since_ms = 0;
    }
}
