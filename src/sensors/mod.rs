//! Sensor subsystem: the [`Sensor`] device trait, registry slots and the
//! per-cycle reading table.
//!
//! Concrete drivers live in submodules.  Each is generic over an
//! embedded-hal pin or a raw sample source so the same code runs against
//! real peripherals on the ESP32 and against mocks on the host.

pub mod digital_input;
pub mod thermistor;

use log::warn;

use crate::error::{CodecError, SensorError};
use crate::naming::{self, Label, Name};
use crate::registry::{SlotId, SlotRegistry};

/// Maximum number of simultaneously registered sensors.
pub const MAX_SENSORS: usize = 8;

pub type SensorRegistry = SlotRegistry<SensorSlot, MAX_SENSORS>;

/// Runtime type tag.  Persisted in every sensor record and compared on
/// restore, so discriminants must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorKind {
    DigitalInput = 1,
    Thermistor = 2,
    /// Anything defined outside this crate.
    Custom = 0xF0,
}

impl SensorKind {
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

/// A device that produces one numeric reading per cycle.
pub trait Sensor {
    fn kind(&self) -> SensorKind;

    /// Take one reading.
    fn read(&mut self) -> Result<f64, SensorError>;

    /// Write calibration parameters into `buf`.  Returns bytes written.
    fn serialize(&self, _buf: &mut [u8]) -> Result<usize, CodecError> {
        Ok(0)
    }

    /// Apply calibration parameters.  Returns bytes consumed.  On error
    /// nothing is applied.
    fn deserialize(&mut self, _buf: &[u8]) -> Result<usize, CodecError> {
        Ok(0)
    }
}

/// A registered sensor: driver plus identity.
pub struct SensorSlot {
    name: Name,
    label: Label,
    device: Box<dyn Sensor>,
}

impl SensorSlot {
    pub fn new(name: &str, device: Box<dyn Sensor>) -> Self {
        Self {
            name: naming::name_from(name),
            label: Label::new(),
            device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = naming::name_from(name);
    }

    /// Engine-assigned label (`S<id>`), empty until registered.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    pub fn kind(&self) -> SensorKind {
        self.device.kind()
    }

    pub fn read(&mut self) -> Result<f64, SensorError> {
        self.device.read()
    }

    pub fn device(&self) -> &dyn Sensor {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn Sensor {
        self.device.as_mut()
    }
}

/// Latest good value of every sensor slot.
///
/// A failed read leaves the previous value in place; a slot that has
/// never been read successfully holds `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReadings {
    values: [Option<f64>; MAX_SENSORS],
}

impl SensorReadings {
    pub const fn new() -> Self {
        Self {
            values: [None; MAX_SENSORS],
        }
    }

    /// Reading for `sensor`, or `None` if unassigned, out of range or
    /// never read.
    pub fn get(&self, sensor: SlotId) -> Option<f64> {
        *self.values.get(sensor.index()?)?
    }

    pub fn set(&mut self, sensor: SlotId, value: f64) {
        if let Some(v) = sensor.index().and_then(|i| self.values.get_mut(i)) {
            *v = Some(value);
        }
    }

    pub fn clear(&mut self, sensor: SlotId) {
        if let Some(v) = sensor.index().and_then(|i| self.values.get_mut(i)) {
            *v = None;
        }
    }

    /// Read every registered sensor once and record the results.
    ///
    /// Read failures are logged, reported through `on_error` and the
    /// previous good value is retained.  Returns the number of successful
    /// reads.
    pub fn refresh(
        &mut self,
        sensors: &mut SensorRegistry,
        mut on_error: impl FnMut(SlotId, SensorError),
    ) -> usize {
        let mut ok = 0;
        for (id, slot) in sensors.iter_mut() {
            match slot.read() {
                Ok(value) => {
                    self.set(id, value);
                    ok += 1;
                }
                Err(e) => {
                    warn!("Sensor {} ({}): {}", slot.label(), slot.name(), e);
                    on_error(id, e);
                }
            }
        }
        ok
    }
}

impl Default for SensorReadings {
    fn default() -> Self {
        Self::new()
    }
}
