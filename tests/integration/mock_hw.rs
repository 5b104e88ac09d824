//! Mock hardware and port adapters for integration tests.
//!
//! Pins and sensors share their state through `Rc<Cell<_>>` handles so a
//! test can script inputs and observe outputs after the device has been
//! boxed into a registry.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use aquanode::actuators::{Actuator, ActuatorKind};
use aquanode::app::events::AppEvent;
use aquanode::app::ports::{
    ClockPort, EventSink, StorageError, StoragePort, TelemetryError, TelemetrySample,
    TelemetrySink, TimeOfDay,
};
use aquanode::error::{ActuatorError, SensorError};
use aquanode::sensors::{Sensor, SensorKind};

// ── Pins ──────────────────────────────────────────────────────

/// embedded-hal output pin whose level is visible to the test.
#[derive(Clone, Default)]
pub struct MockPin {
    pub high: Rc<Cell<bool>>,
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

impl embedded_hal::digital::InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high.get())
    }
}

// ── Sensors ───────────────────────────────────────────────────

/// Sensor that returns whatever the test last stored; `None` fails the
/// read.
#[derive(Clone, Default)]
pub struct ScriptedSensor {
    pub value: Rc<Cell<Option<f64>>>,
    pub reads: Rc<Cell<usize>>,
}

impl ScriptedSensor {
    pub fn reading(value: f64) -> Self {
        let s = Self::default();
        s.value.set(Some(value));
        s
    }

    pub fn set(&self, value: f64) {
        self.value.set(Some(value));
    }

    pub fn fail(&self) {
        self.value.set(None);
    }
}

impl Sensor for ScriptedSensor {
    fn kind(&self) -> SensorKind {
        SensorKind::Custom
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        self.reads.set(self.reads.get() + 1);
        self.value.get().ok_or(SensorError::ProbeNoResponse)
    }
}

// ── Actuators ─────────────────────────────────────────────────

/// Actuator that records its state and every command.
#[derive(Clone, Default)]
pub struct MockRelay {
    pub on: Rc<Cell<bool>>,
    pub commands: Rc<RefCell<Vec<bool>>>,
}

impl Actuator for MockRelay {
    fn kind(&self) -> ActuatorKind {
        ActuatorKind::Custom
    }

    fn on(&mut self) -> Result<(), ActuatorError> {
        self.on.set(true);
        self.commands.borrow_mut().push(true);
        Ok(())
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        self.on.set(false);
        self.commands.borrow_mut().push(false);
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on.get()
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStorage {
    pub store: HashMap<String, Vec<u8>>,
    pub writes: usize,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Overwrite a stored value directly, bypassing the codec.
    pub fn poke(&mut self, namespace: &str, key: &str, data: &[u8]) {
        self.store.insert(Self::key(namespace, key), data.to_vec());
    }
}

impl StoragePort for MemStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .store
            .get(&Self::key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        if v.len() > buf.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buf[..v.len()].copy_from_slice(v);
        Ok(v.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.writes += 1;
        self.store.insert(Self::key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&Self::key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&Self::key(namespace, key))
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct FixedClock {
    pub now_ms: Cell<u64>,
    pub time: Cell<Option<TimeOfDay>>,
}

impl FixedClock {
    pub fn at(now_ms: u64) -> Self {
        let c = Self::default();
        c.now_ms.set(now_ms);
        c
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn set_time(&self, hour: u8, minute: u8, weekday: u8) {
        self.time.set(Some(TimeOfDay {
            hour,
            minute,
            weekday,
        }));
    }
}

impl ClockPort for FixedClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        self.time.get()
    }
}

// ── Sinks ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingUplink {
    pub batches: Vec<Vec<TelemetrySample>>,
    pub offline: bool,
}

impl TelemetrySink for RecordingUplink {
    fn publish(&mut self, samples: &[TelemetrySample]) -> Result<(), TelemetryError> {
        if self.offline {
            return Err(TelemetryError::Offline);
        }
        self.batches.push(samples.to_vec());
        Ok(())
    }
}
