//! Controller subsystem: the [`Controller`] trait, its per-run
//! [`ControlContext`] and registry slots.
//!
//! ```text
//!   Aquarium::run_cycle
//!     ├─ readings ─────────────┐
//!     ├─ actuators (mut) ──────┤
//!     └─ for each controller ──┴─▶ ControlContext ─▶ Controller::run
//! ```
//!
//! Controllers never reach for global state.  Everything a rule may look
//! at or touch arrives through the context for the duration of one call.

pub mod clock_timer;
pub mod level;
pub mod temperature;

use log::{debug, warn};

use crate::actuators::{ActuatorRegistry, MAX_ACTUATORS};
use crate::app::ports::TimeOfDay;
use crate::assignment;
use crate::error::CodecError;
use crate::naming::{self, Label, Name};
use crate::registry::{SlotId, SlotRegistry};
use crate::sensors::SensorReadings;

/// Maximum number of simultaneously registered controllers.
pub const MAX_CONTROLLERS: usize = 8;

/// Actuator switches recorded per cycle.  Further switches still happen
/// but are not reported.
pub const SWITCH_LOG_CAPACITY: usize = 32;

pub type ControllerRegistry = SlotRegistry<ControllerSlot, MAX_CONTROLLERS>;

/// Runtime type tag.  Persisted; never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControllerKind {
    Temperature = 1,
    Level = 2,
    ClockTimer = 3,
    Custom = 0xF0,
}

impl ControllerKind {
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

/// Outcome of one [`Controller::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The rule was evaluated.
    Ran,
    /// Not configured or missing input (no sensor, no reading, no clock).
    /// No actuator was touched.
    Skipped,
    /// Latched in a terminal state until [`Controller::reset`].
    Latched,
}

/// One actuator state change performed during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorSwitch {
    pub actuator: SlotId,
    pub controller: SlotId,
    pub on: bool,
}

pub type SwitchLog = heapless::Vec<ActuatorSwitch, SWITCH_LOG_CAPACITY>;

/// A control rule.
pub trait Controller {
    fn kind(&self) -> ControllerKind;

    /// Evaluate the rule once.
    fn run(&mut self, ctx: &mut ControlContext<'_>) -> RunStatus;

    /// Encode parameters and latched state into `buf`.  Returns bytes
    /// written, or [`CodecError::BufferTooSmall`] if `buf` cannot hold the
    /// record; the contents of `buf` are unspecified in that case.
    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError>;

    /// Exact inverse of [`serialize`](Self::serialize).  Returns bytes
    /// consumed.  On error nothing is applied.
    fn deserialize(&mut self, buf: &[u8]) -> Result<usize, CodecError>;

    /// Drop latched runtime state (timeouts, hysteresis latches).
    fn reset(&mut self) {}
}

/// `id` if it addresses a slot of a registry holding `capacity` items,
/// otherwise unassigned.  Applied to ids read back from storage.
pub(crate) fn within(id: SlotId, capacity: usize) -> SlotId {
    match id.index() {
        Some(i) if i < capacity => id,
        _ => SlotId::UNASSIGNED,
    }
}

/// Everything a controller can see and do during one run.
pub struct ControlContext<'a> {
    controller: SlotId,
    readings: &'a SensorReadings,
    actuators: &'a mut ActuatorRegistry,
    uptime_ms: u64,
    time_of_day: Option<TimeOfDay>,
    switches: &'a mut SwitchLog,
}

impl<'a> ControlContext<'a> {
    pub fn new(
        controller: SlotId,
        readings: &'a SensorReadings,
        actuators: &'a mut ActuatorRegistry,
        uptime_ms: u64,
        time_of_day: Option<TimeOfDay>,
        switches: &'a mut SwitchLog,
    ) -> Self {
        Self {
            controller,
            readings,
            actuators,
            uptime_ms,
            time_of_day,
            switches,
        }
    }

    /// Slot id of the controller being run.
    pub fn controller_id(&self) -> SlotId {
        self.controller
    }

    /// Latest good reading of `sensor`.
    pub fn reading(&self, sensor: SlotId) -> Option<f64> {
        self.readings.get(sensor)
    }

    pub fn uptime_ms(&self) -> u64 {
        self.uptime_ms
    }

    pub fn time_of_day(&self) -> Option<TimeOfDay> {
        self.time_of_day
    }

    /// Whether `actuator` resolves to an occupied slot assigned to this
    /// controller.
    pub fn has_actuator(&self, actuator: SlotId) -> bool {
        self.actuators
            .get(actuator)
            .is_some_and(|slot| slot.controller() == self.controller)
    }

    pub fn is_on(&self, actuator: SlotId) -> Option<bool> {
        self.actuators.get(actuator).map(|a| a.is_on())
    }

    /// Drive one actuator.  Returns `false` if the id does not resolve to
    /// an actuator assigned to this controller, or the driver failed; the
    /// failure is logged.
    pub fn switch_actuator(&mut self, actuator: SlotId, on: bool) -> bool {
        let Some(slot) = self.actuators.get_mut(actuator) else {
            return false;
        };
        if slot.controller() != self.controller {
            debug!(
                "{} is not assigned to C{}; command ignored",
                slot.label(),
                self.controller
            );
            return false;
        }
        match slot.switch(on) {
            Ok(changed) => {
                if changed {
                    // Overflowing the log only loses the report, not the switch.
                    let _ = self.switches.push(ActuatorSwitch {
                        actuator,
                        controller: self.controller,
                        on,
                    });
                }
                true
            }
            Err(e) => {
                warn!("{} ({}): {}", slot.label(), slot.name(), e);
                false
            }
        }
    }

    /// Ids of every actuator assigned to this controller.
    pub fn assigned_actuators(&self, out: &mut [SlotId]) -> usize {
        assignment::assigned_actuator_ids(&*self.actuators, self.controller, out)
    }

    /// Drive every actuator assigned to this controller.  Returns how
    /// many accepted the command.
    pub fn switch_assigned(&mut self, on: bool) -> usize {
        let mut ids = [SlotId::UNASSIGNED; MAX_ACTUATORS];
        let total = self.assigned_actuators(&mut ids);
        let mut ok = 0;
        for &id in &ids[..total.min(MAX_ACTUATORS)] {
            if self.switch_actuator(id, on) {
                ok += 1;
            }
        }
        ok
    }
}

/// A registered controller: rule plus identity.
pub struct ControllerSlot {
    name: Name,
    label: Label,
    rule: Box<dyn Controller>,
}

impl ControllerSlot {
    pub fn new(name: &str, rule: Box<dyn Controller>) -> Self {
        Self {
            name: naming::name_from(name),
            label: Label::new(),
            rule,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = naming::name_from(name);
    }

    /// Engine-assigned label (`C<id>`), empty until registered.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    pub fn kind(&self) -> ControllerKind {
        self.rule.kind()
    }

    pub fn run(&mut self, ctx: &mut ControlContext<'_>) -> RunStatus {
        self.rule.run(ctx)
    }

    pub fn rule(&self) -> &dyn Controller {
        self.rule.as_ref()
    }

    pub fn rule_mut(&mut self) -> &mut dyn Controller {
        self.rule.as_mut()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared test fixtures
// ═══════════════════════════════════════════════════════════════
