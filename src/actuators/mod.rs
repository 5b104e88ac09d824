//! Actuator subsystem: the [`Actuator`] device trait and registry slots.
//!
//! Every actuator slot carries a back-reference to the controller that
//! drives it.  The reference is a plain [`SlotId`]; the assignment index
//! ([`crate::assignment`]) resolves it against the controller registry on
//! demand.

pub mod digital_output;
pub mod pwm_output;

use log::info;

use crate::error::{ActuatorError, CodecError};
use crate::naming::{self, Label, Name};
use crate::registry::{SlotId, SlotRegistry};

/// Maximum number of simultaneously registered actuators.
pub const MAX_ACTUATORS: usize = 24;

pub type ActuatorRegistry = SlotRegistry<ActuatorSlot, MAX_ACTUATORS>;

/// Runtime type tag.  Persisted; never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActuatorKind {
    DigitalOutput = 1,
    PwmOutput = 2,
    Custom = 0xF0,
}

impl ActuatorKind {
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

/// A switchable output.
///
/// PWM-capable devices additionally accept a duty cycle in `0.0..=1.0`;
/// for all others [`set_pwm`](Self::set_pwm) fails with
/// [`ActuatorError::PwmUnsupported`].
pub trait Actuator {
    fn kind(&self) -> ActuatorKind;

    fn on(&mut self) -> Result<(), ActuatorError>;

    fn off(&mut self) -> Result<(), ActuatorError>;

    fn is_on(&self) -> bool;

    fn supports_pwm(&self) -> bool {
        false
    }

    fn set_pwm(&mut self, _duty: f32) -> Result<(), ActuatorError> {
        Err(ActuatorError::PwmUnsupported)
    }

    /// Effective output level.  Two-state devices report 0.0 or 1.0.
    fn pwm(&self) -> f32 {
        if self.is_on() { 1.0 } else { 0.0 }
    }

    fn serialize(&self, _buf: &mut [u8]) -> Result<usize, CodecError> {
        Ok(0)
    }

    fn deserialize(&mut self, _buf: &[u8]) -> Result<usize, CodecError> {
        Ok(0)
    }
}

/// A registered actuator: driver, identity and controller back-reference.
pub struct ActuatorSlot {
    name: Name,
    label: Label,
    controller: SlotId,
    device: Box<dyn Actuator>,
}

impl ActuatorSlot {
    pub fn new(name: &str, device: Box<dyn Actuator>) -> Self {
        Self {
            name: naming::name_from(name),
            label: Label::new(),
            controller: SlotId::UNASSIGNED,
            device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = naming::name_from(name);
    }

    /// Engine-assigned label (`A<id>`), empty until registered.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    /// Id of the controller this actuator is assigned to.  May dangle if
    /// the caller bypassed [`Aquarium`](crate::app::service::Aquarium).
    pub fn controller(&self) -> SlotId {
        self.controller
    }

    pub fn assign_controller(&mut self, controller: SlotId) {
        self.controller = controller;
    }

    pub fn kind(&self) -> ActuatorKind {
        self.device.kind()
    }

    pub fn is_on(&self) -> bool {
        self.device.is_on()
    }

    /// Drive the output.  Returns `Ok(true)` if the state changed.
    pub fn switch(&mut self, on: bool) -> Result<bool, ActuatorError> {
        if self.device.is_on() == on {
            return Ok(false);
        }
        if on {
            self.device.on()?;
        } else {
            self.device.off()?;
        }
        info!("{} ({}) -> {}", self.label, self.name, if on { "ON" } else { "OFF" });
        Ok(true)
    }

    pub fn device(&self) -> &dyn Actuator {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn Actuator {
        self.device.as_mut()
    }
}
