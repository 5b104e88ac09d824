//! Read-only status snapshot for UI collaborators.
//!
//! A web page or a serial console renders the aquarium from one
//! [`StatusSnapshot`]; [`Aquarium::status_json`] is the wire form.

use serde::Serialize;

use crate::actuators::MAX_ACTUATORS;
use crate::controllers::MAX_CONTROLLERS;
use crate::naming::{self, Name};
use crate::registry::SlotId;
use crate::sensors::MAX_SENSORS;

use super::service::Aquarium;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub id: SlotId,
    pub name: Name,
    pub kind: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActuatorStatus {
    pub id: SlotId,
    pub name: Name,
    pub kind: u8,
    pub controller: SlotId,
    pub on: bool,
    /// Duty cycle for PWM-capable outputs.
    pub pwm: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatus {
    pub id: SlotId,
    pub name: Name,
    pub kind: u8,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub cycle: u64,
    pub controllers: heapless::Vec<ControllerStatus, MAX_CONTROLLERS>,
    pub actuators: heapless::Vec<ActuatorStatus, MAX_ACTUATORS>,
    pub sensors: heapless::Vec<SensorStatus, MAX_SENSORS>,
}

impl Aquarium {
    /// Snapshot of every occupied slot, in ascending id order.
    pub fn status(&self) -> StatusSnapshot {
        let mut snap = StatusSnapshot {
            cycle: self.cycle_count(),
            ..StatusSnapshot::default()
        };
        for (id, c) in self.controller_slots() {
            let _ = snap.controllers.push(ControllerStatus {
                id,
                name: naming::name_from(c.name()),
                kind: c.kind() as u8,
            });
        }
        for (id, a) in self.actuator_slots() {
            let device = a.device();
            let _ = snap.actuators.push(ActuatorStatus {
                id,
                name: naming::name_from(a.name()),
                kind: a.kind() as u8,
                controller: a.controller(),
                on: a.is_on(),
                pwm: device.supports_pwm().then(|| device.pwm()),
            });
        }
        for (id, s) in self.sensor_slots() {
            let _ = snap.sensors.push(SensorStatus {
                id,
                name: naming::name_from(s.name()),
                kind: s.kind() as u8,
                value: self.sensor_value(id),
            });
        }
        snap
    }

    /// [`status`](Self::status) rendered as JSON.
    pub fn status_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.status())
    }
}
