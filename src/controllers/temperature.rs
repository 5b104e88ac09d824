//! Two-sided thermostat with independent heating and cooling hysteresis.
//!
//! ```text
//!               T < low                      T > high
//!   Heating ◀────────────── Idle ──────────────▶ Cooling
//!      │   T >= low + heat_hyst    T <= high - cool_hyst   │
//!      └────────────────────▶ Idle ◀───────────────────────┘
//! ```
//!
//! A reading that crosses straight from one side to the other switches
//! directly between Heating and Cooling.  Heating and cooling are never
//! active together.

use serde::{Deserialize, Serialize};

use super::{ControlContext, Controller, ControllerKind, RunStatus, within};
use crate::actuators::MAX_ACTUATORS;
use crate::error::CodecError;
use crate::registry::SlotId;
use crate::sensors::MAX_SENSORS;

/// Encoded size of the parameter record.
pub const RECORD_LEN: usize = 37;

/// Latched thermostat state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThermalState {
    #[default]
    Idle,
    Heating,
    Cooling,
}

/// Persisted layout.  Field order is part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct TemperatureRecord {
    sensor: SlotId,
    ref_temp_low: f64,
    heating_hysteresis: f64,
    heating_actuator: SlotId,
    ref_temp_high: f64,
    cooling_hysteresis: f64,
    cooling_actuator: SlotId,
    cooling: bool,
    heating: bool,
}

pub struct TemperatureController {
    sensor: SlotId,
    ref_temp_low: f64,
    heating_hysteresis: f64,
    heating_actuator: SlotId,
    ref_temp_high: f64,
    cooling_hysteresis: f64,
    cooling_actuator: SlotId,
    state: ThermalState,
    /// Outputs reflect `state`.  Cleared on restore and after a failed
    /// command so the next run re-drives them.
    outputs_synced: bool,
}

impl TemperatureController {
    /// 24–26 °C band, 0.5 °C hysteresis on both sides, nothing assigned.
    pub fn new() -> Self {
        Self {
            sensor: SlotId::UNASSIGNED,
            ref_temp_low: 24.0,
            heating_hysteresis: 0.5,
            heating_actuator: SlotId::UNASSIGNED,
            ref_temp_high: 26.0,
            cooling_hysteresis: 0.5,
            cooling_actuator: SlotId::UNASSIGNED,
            state: ThermalState::Idle,
            outputs_synced: false,
        }
    }

    pub fn sensor(&self) -> SlotId {
        self.sensor
    }

    pub fn assign_sensor(&mut self, sensor: SlotId) {
        self.sensor = sensor;
    }

    pub fn ref_temp_low(&self) -> f64 {
        self.ref_temp_low
    }

    pub fn set_ref_temp_low(&mut self, celsius: f64) {
        self.ref_temp_low = celsius;
    }

    pub fn heating_hysteresis(&self) -> f64 {
        self.heating_hysteresis
    }

    pub fn set_heating_hysteresis(&mut self, kelvin: f64) {
        self.heating_hysteresis = kelvin;
    }

    pub fn heating_actuator(&self) -> SlotId {
        self.heating_actuator
    }

    pub fn assign_heating_actuator(&mut self, actuator: SlotId) {
        self.heating_actuator = actuator;
        self.outputs_synced = false;
    }

    pub fn ref_temp_high(&self) -> f64 {
        self.ref_temp_high
    }

    pub fn set_ref_temp_high(&mut self, celsius: f64) {
        self.ref_temp_high = celsius;
    }

    pub fn cooling_hysteresis(&self) -> f64 {
        self.cooling_hysteresis
    }

    pub fn set_cooling_hysteresis(&mut self, kelvin: f64) {
        self.cooling_hysteresis = kelvin;
    }

    pub fn cooling_actuator(&self) -> SlotId {
        self.cooling_actuator
    }

    pub fn assign_cooling_actuator(&mut self, actuator: SlotId) {
        self.cooling_actuator = actuator;
        self.outputs_synced = false;
    }

    pub fn state(&self) -> ThermalState {
        self.state
    }

    pub fn is_heating(&self) -> bool {
        self.state == ThermalState::Heating
    }

    pub fn is_cooling(&self) -> bool {
        self.state == ThermalState::Cooling
    }

    /// Next latched state for reading `t`.  A branch whose actuator is
    /// unavailable is never entered, and a latch on such a branch drops.
    fn next_state(&self, t: f64, can_heat: bool, can_cool: bool) -> ThermalState {
        let current = match self.state {
            ThermalState::Heating if !can_heat => ThermalState::Idle,
            ThermalState::Cooling if !can_cool => ThermalState::Idle,
            s => s,
        };

        let too_cold = can_heat && t < self.ref_temp_low;
        let too_warm = can_cool && t > self.ref_temp_high;

        match current {
            ThermalState::Idle if too_cold => ThermalState::Heating,
            ThermalState::Idle if too_warm => ThermalState::Cooling,
            ThermalState::Idle => ThermalState::Idle,

            ThermalState::Heating if too_warm => ThermalState::Cooling,
            ThermalState::Heating if t >= self.ref_temp_low + self.heating_hysteresis => {
                ThermalState::Idle
            }
            ThermalState::Heating => ThermalState::Heating,

            ThermalState::Cooling if too_cold => ThermalState::Heating,
            ThermalState::Cooling if t <= self.ref_temp_high - self.cooling_hysteresis => {
                ThermalState::Idle
            }
            ThermalState::Cooling => ThermalState::Cooling,
        }
    }

    /// Drive the outputs for `state`.  The inactive side is switched off
    /// first so a shared actuator never sees both commands in the wrong
    /// order.
    fn apply(&self, ctx: &mut ControlContext<'_>, can_heat: bool, can_cool: bool) -> bool {
        let heat = self.state == ThermalState::Heating;
        let cool = self.state == ThermalState::Cooling;
        let mut ok = true;

        let mut drive = |id: SlotId, available: bool, on: bool| {
            if available && !ctx.switch_actuator(id, on) {
                ok = false;
            }
        };

        if heat {
            drive(self.cooling_actuator, can_cool, false);
            drive(self.heating_actuator, can_heat, true);
        } else {
            drive(self.heating_actuator, can_heat, false);
            drive(self.cooling_actuator, can_cool, cool);
        }
        ok
    }
}

impl Default for TemperatureController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for TemperatureController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Temperature
    }

    fn run(&mut self, ctx: &mut ControlContext<'_>) -> RunStatus {
        let Some(t) = ctx.reading(self.sensor) else {
            return RunStatus::Skipped;
        };

        let can_heat = ctx.has_actuator(self.heating_actuator);
        let can_cool = ctx.has_actuator(self.cooling_actuator);

        let next = self.next_state(t, can_heat, can_cool);
        if next != self.state || !self.outputs_synced {
            self.state = next;
            self.outputs_synced = self.apply(ctx, can_heat, can_cool);
        }
        RunStatus::Ran
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let record = TemperatureRecord {
            sensor: self.sensor,
            ref_temp_low: self.ref_temp_low,
            heating_hysteresis: self.heating_hysteresis,
            heating_actuator: self.heating_actuator,
            ref_temp_high: self.ref_temp_high,
            cooling_hysteresis: self.cooling_hysteresis,
            cooling_actuator: self.cooling_actuator,
            cooling: self.is_cooling(),
            heating: self.is_heating(),
        };
        if buf.len() < RECORD_LEN {
            return Err(CodecError::BufferTooSmall);
        }
        Ok(postcard::to_slice(&record, buf)?.len())
    }

    fn deserialize(&mut self, buf: &[u8]) -> Result<usize, CodecError> {
        let (record, rest) = postcard::take_from_bytes::<TemperatureRecord>(buf)?;
        let state = match (record.heating, record.cooling) {
            (false, false) => ThermalState::Idle,
            (true, false) => ThermalState::Heating,
            (false, true) => ThermalState::Cooling,
            (true, true) => return Err(CodecError::Invalid),
        };

        self.sensor = within(record.sensor, MAX_SENSORS);
        self.ref_temp_low = record.ref_temp_low;
        self.heating_hysteresis = record.heating_hysteresis;
        self.heating_actuator = within(record.heating_actuator, MAX_ACTUATORS);
        self.ref_temp_high = record.ref_temp_high;
        self.cooling_hysteresis = record.cooling_hysteresis;
        self.cooling_actuator = within(record.cooling_actuator, MAX_ACTUATORS);
        self.state = state;
        self.outputs_synced = false;
        Ok(buf.len() - rest.len())
    }

    fn reset(&mut self) {
        self.state = ThermalState::Idle;
        self.outputs_synced = false;
    }
}
