//! Application service: the hexagonal core.
//!
//! [`Aquarium`] owns the three registries, the per-sensor reading table
//! and the telemetry buffer.  It exposes a hardware-agnostic API; storage
//! and event output flow through port traits passed in at call sites, so
//! the whole service is testable with mock adapters.
//!
//! ```text
//!  ConfigStore ──▶ ┌──────────────────────────────────┐ ──▶ EventSink
//!                  │             Aquarium              │
//!    Sensors ────▶ │ controllers · actuators · sensors │ ──▶ Actuators
//!                  └──────────────────────────────────┘
//! ```

use heapless::Deque;
use log::{info, warn};

use crate::actuators::{Actuator, ActuatorRegistry, ActuatorSlot};
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, StoragePort, TelemetrySample, TimeOfDay};
use crate::assignment;
use crate::controllers::{
    ControlContext, Controller, ControllerRegistry, ControllerSlot, RunStatus, SwitchLog,
};
use crate::error::{RegistryError, SensorError};
use crate::naming::{self, ObjectTag};
use crate::persistence::{ConfigStore, Restore};
use crate::registry::SlotId;
use crate::sensors::{MAX_SENSORS, Sensor, SensorReadings, SensorRegistry, SensorSlot};

/// Telemetry samples kept between flushes.  The oldest sample is dropped
/// when the buffer is full.
pub const TELEMETRY_CAPACITY: usize = 64;

pub type TelemetryBuffer = Deque<TelemetrySample, TELEMETRY_CAPACITY>;

/// What happened during one [`Aquarium::run_cycle`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// 1-based cycle counter.
    pub cycle: u64,
    pub sensors_read: usize,
    pub sensor_failures: heapless::Vec<(SlotId, SensorError), MAX_SENSORS>,
    pub controllers_run: usize,
    pub controllers_skipped: usize,
    pub controllers_latched: usize,
    pub switches: SwitchLog,
}

/// Counts of a bulk save or restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub applied: usize,
    pub not_found: usize,
    pub mismatched: usize,
    pub failed: usize,
}

/// The aquarium: every registered object plus the state shared between
/// cycles.
pub struct Aquarium {
    controllers: ControllerRegistry,
    actuators: ActuatorRegistry,
    sensors: SensorRegistry,
    readings: SensorReadings,
    telemetry: TelemetryBuffer,
    cycle_count: u64,
}

impl Aquarium {
    pub fn new() -> Self {
        Self {
            controllers: ControllerRegistry::new(),
            actuators: ActuatorRegistry::new(),
            sensors: SensorRegistry::new(),
            readings: SensorReadings::new(),
            telemetry: TelemetryBuffer::new(),
            cycle_count: 0,
        }
    }

    // ── Registration ──────────────────────────────────────────

    /// Register a controller and assign its `C<id>` label.  Returns
    /// `None` (after logging and emitting an event) when the registry is
    /// full.
    pub fn add_controller(
        &mut self,
        name: &str,
        rule: Box<dyn Controller>,
        sink: &mut impl EventSink,
    ) -> Option<SlotId> {
        let Some(id) = self.controllers.add(ControllerSlot::new(name, rule)) else {
            return capacity_exhausted(ObjectTag::Controller, name, sink);
        };
        if let Some(slot) = self.controllers.get_mut(id) {
            slot.set_label(naming::label(ObjectTag::Controller, id));
            info!("Controller {} ({}) registered", slot.label(), slot.name());
        }
        Some(id)
    }

    pub fn add_actuator(
        &mut self,
        name: &str,
        device: Box<dyn Actuator>,
        sink: &mut impl EventSink,
    ) -> Option<SlotId> {
        let Some(id) = self.actuators.add(ActuatorSlot::new(name, device)) else {
            return capacity_exhausted(ObjectTag::Actuator, name, sink);
        };
        if let Some(slot) = self.actuators.get_mut(id) {
            slot.set_label(naming::label(ObjectTag::Actuator, id));
            info!("Actuator {} ({}) registered", slot.label(), slot.name());
        }
        Some(id)
    }

    pub fn add_sensor(
        &mut self,
        name: &str,
        device: Box<dyn Sensor>,
        sink: &mut impl EventSink,
    ) -> Option<SlotId> {
        let Some(id) = self.sensors.add(SensorSlot::new(name, device)) else {
            return capacity_exhausted(ObjectTag::Sensor, name, sink);
        };
        if let Some(slot) = self.sensors.get_mut(id) {
            slot.set_label(naming::label(ObjectTag::Sensor, id));
            info!("Sensor {} ({}) registered", slot.label(), slot.name());
        }
        Some(id)
    }

    /// Remove a controller.  Every actuator that pointed at it becomes
    /// unassigned, so a later occupant of the slot starts with no
    /// actuators.
    pub fn remove_controller(&mut self, id: SlotId) -> Option<ControllerSlot> {
        let removed = self.controllers.remove(id)?;
        for (_, actuator) in self.actuators.iter_mut() {
            if actuator.controller() == id {
                actuator.assign_controller(SlotId::UNASSIGNED);
            }
        }
        info!("Controller {} ({}) removed", removed.label(), removed.name());
        Some(removed)
    }

    /// Remove an actuator.  Controllers referring to it by id find an
    /// empty slot from now on and skip it.
    pub fn remove_actuator(&mut self, id: SlotId) -> Option<ActuatorSlot> {
        let removed = self.actuators.remove(id)?;
        info!("Actuator {} ({}) removed", removed.label(), removed.name());
        Some(removed)
    }

    /// Remove a sensor and forget its last reading.
    pub fn remove_sensor(&mut self, id: SlotId) -> Option<SensorSlot> {
        let removed = self.sensors.remove(id)?;
        self.readings.clear(id);
        info!("Sensor {} ({}) removed", removed.label(), removed.name());
        Some(removed)
    }

    // ── Lookup ────────────────────────────────────────────────

    pub fn controller(&self, id: SlotId) -> Option<&ControllerSlot> {
        self.controllers.get(id)
    }

    pub fn controller_mut(&mut self, id: SlotId) -> Option<&mut ControllerSlot> {
        self.controllers.get_mut(id)
    }

    /// Slot id of exactly this controller object.
    pub fn controller_id(&self, slot: &ControllerSlot) -> Option<SlotId> {
        self.controllers.find_element(slot)
    }

    pub fn actuator(&self, id: SlotId) -> Option<&ActuatorSlot> {
        self.actuators.get(id)
    }

    pub fn actuator_mut(&mut self, id: SlotId) -> Option<&mut ActuatorSlot> {
        self.actuators.get_mut(id)
    }

    pub fn actuator_id(&self, slot: &ActuatorSlot) -> Option<SlotId> {
        self.actuators.find_element(slot)
    }

    pub fn sensor(&self, id: SlotId) -> Option<&SensorSlot> {
        self.sensors.get(id)
    }

    pub fn sensor_mut(&mut self, id: SlotId) -> Option<&mut SensorSlot> {
        self.sensors.get_mut(id)
    }

    pub fn sensor_id(&self, slot: &SensorSlot) -> Option<SlotId> {
        self.sensors.find_element(slot)
    }

    /// Registry access for cursor-style iteration by UI collaborators.
    pub fn controllers(&mut self) -> &mut ControllerRegistry {
        &mut self.controllers
    }

    pub fn actuators(&mut self) -> &mut ActuatorRegistry {
        &mut self.actuators
    }

    pub fn sensors(&mut self) -> &mut SensorRegistry {
        &mut self.sensors
    }

    /// Occupied controller slots in ascending id order.
    pub fn controller_slots(&self) -> impl Iterator<Item = (SlotId, &ControllerSlot)> {
        self.controllers.iter()
    }

    pub fn actuator_slots(&self) -> impl Iterator<Item = (SlotId, &ActuatorSlot)> {
        self.actuators.iter()
    }

    pub fn sensor_slots(&self) -> impl Iterator<Item = (SlotId, &SensorSlot)> {
        self.sensors.iter()
    }

    pub fn nr_of_controllers(&self) -> usize {
        self.controllers.len()
    }

    pub fn nr_of_actuators(&self) -> usize {
        self.actuators.len()
    }

    pub fn nr_of_sensors(&self) -> usize {
        self.sensors.len()
    }

    /// Latest good reading of `sensor`.
    pub fn sensor_value(&self, sensor: SlotId) -> Option<f64> {
        self.readings.get(sensor)
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    // ── Assignment ────────────────────────────────────────────

    /// Point `actuator` at `controller`, or detach it with
    /// [`SlotId::UNASSIGNED`].
    pub fn assign_actuator(
        &mut self,
        actuator: SlotId,
        controller: SlotId,
    ) -> Result<(), RegistryError> {
        if controller.is_assigned() && !self.controllers.contains(controller) {
            return Err(RegistryError::NotFound);
        }
        let slot = self.actuators.get_mut(actuator).ok_or(RegistryError::NotFound)?;
        slot.assign_controller(controller);
        Ok(())
    }

    /// Actuators assigned to `controller`, in ascending id order.  Fills
    /// at most `out.len()` entries and returns the true count.  A
    /// controller object that is not registered here has no actuators.
    pub fn assigned_actuators<'a>(
        &'a self,
        controller: &ControllerSlot,
        out: &mut [Option<&'a ActuatorSlot>],
    ) -> usize {
        match self.controllers.find_element(controller) {
            Some(id) => assignment::assigned_actuators(&self.actuators, id, out),
            None => 0,
        }
    }

    /// Id form of [`assigned_actuators`](Self::assigned_actuators).
    pub fn assigned_actuator_ids(&self, controller: SlotId, out: &mut [SlotId]) -> usize {
        if !self.controllers.contains(controller) {
            return 0;
        }
        assignment::assigned_actuator_ids(&self.actuators, controller, out)
    }

    /// The live controller `actuator` is assigned to.  Dangling
    /// back-references resolve to `None`.
    pub fn controller_of(&self, actuator: SlotId) -> Option<SlotId> {
        let controller = self.actuators.get(actuator)?.controller();
        self.controllers.contains(controller).then_some(controller)
    }

    // ── Control cycle ─────────────────────────────────────────

    /// Run one control cycle: read every sensor, then run every
    /// controller in ascending slot order.
    pub fn run_cycle(&mut self, uptime_ms: u64, time_of_day: Option<TimeOfDay>) -> CycleReport {
        self.cycle_count += 1;
        let mut report = CycleReport {
            cycle: self.cycle_count,
            ..CycleReport::default()
        };

        // 1. Sensors
        let failures = &mut report.sensor_failures;
        report.sensors_read = self.readings.refresh(&mut self.sensors, |id, e| {
            let _ = failures.push((id, e));
        });
        // Stale last-good values stay out of telemetry.
        for (id, _) in self.sensors.iter() {
            if report.sensor_failures.iter().any(|&(failed, _)| failed == id) {
                continue;
            }
            if let Some(value) = self.readings.get(id) {
                if self.telemetry.is_full() {
                    self.telemetry.pop_front();
                }
                let _ = self.telemetry.push_back(TelemetrySample {
                    sensor: id,
                    value,
                    uptime_ms,
                });
            }
        }

        // 2. Controllers
        self.controllers.reset_iterator();
        while let Some((id, controller)) = self.controllers.get_next() {
            let mut ctx = ControlContext::new(
                id,
                &self.readings,
                &mut self.actuators,
                uptime_ms,
                time_of_day,
                &mut report.switches,
            );
            match controller.run(&mut ctx) {
                RunStatus::Ran => report.controllers_run += 1,
                RunStatus::Skipped => report.controllers_skipped += 1,
                RunStatus::Latched => report.controllers_latched += 1,
            }
        }

        report
    }

    // ── Telemetry ─────────────────────────────────────────────

    pub fn pending_telemetry(&self) -> usize {
        self.telemetry.len()
    }

    /// Copy of the buffered samples, oldest first.
    pub fn telemetry_snapshot(&self) -> heapless::Vec<TelemetrySample, TELEMETRY_CAPACITY> {
        self.telemetry.iter().copied().collect()
    }

    /// Drop the oldest `count` samples (after they were delivered).
    pub fn discard_telemetry(&mut self, count: usize) {
        for _ in 0..count {
            if self.telemetry.pop_front().is_none() {
                break;
            }
        }
    }

    // ── Persistence ───────────────────────────────────────────

    /// Write every occupied slot to `store`.
    pub fn save_all<S: StoragePort>(
        &self,
        store: &mut ConfigStore<S>,
        sink: &mut impl EventSink,
    ) -> PersistSummary {
        let mut summary = PersistSummary::default();
        for (id, slot) in self.controllers.iter() {
            tally_save(&mut summary, ObjectTag::Controller, id, store.write_controller(id, slot), sink);
        }
        for (id, slot) in self.actuators.iter() {
            tally_save(&mut summary, ObjectTag::Actuator, id, store.write_actuator(id, slot), sink);
        }
        for (id, slot) in self.sensors.iter() {
            tally_save(&mut summary, ObjectTag::Sensor, id, store.write_sensor(id, slot), sink);
        }
        info!("Config: saved {} records ({} failed)", summary.applied, summary.failed);
        summary
    }

    /// Restore every occupied slot from `store`.  Missing or mismatched
    /// records leave the object at its defaults.
    pub fn restore_all<S: StoragePort>(
        &mut self,
        store: &ConfigStore<S>,
        sink: &mut impl EventSink,
    ) -> PersistSummary {
        let mut summary = PersistSummary::default();
        for (id, slot) in self.controllers.iter_mut() {
            let res = store.read_controller(id, slot);
            tally_restore(&mut summary, ObjectTag::Controller, id, res, sink);
        }
        for (id, slot) in self.actuators.iter_mut() {
            let res = store.read_actuator(id, slot);
            tally_restore(&mut summary, ObjectTag::Actuator, id, res, sink);
        }
        for (id, slot) in self.sensors.iter_mut() {
            let res = store.read_sensor(id, slot);
            tally_restore(&mut summary, ObjectTag::Sensor, id, res, sink);
        }
        info!(
            "Config: restored {} records ({} missing, {} mismatched, {} failed)",
            summary.applied, summary.not_found, summary.mismatched, summary.failed
        );
        summary
    }
}

impl Default for Aquarium {
    fn default() -> Self {
        Self::new()
    }
}

fn capacity_exhausted(kind: ObjectTag, name: &str, sink: &mut impl EventSink) -> Option<SlotId> {
    warn!("{:?} registry full; '{}' not added", kind, name);
    sink.emit(&AppEvent::CapacityExhausted {
        kind,
        name: naming::name_from(name),
    });
    None
}

fn tally_save(
    summary: &mut PersistSummary,
    tag: ObjectTag,
    id: SlotId,
    result: crate::error::Result<()>,
    sink: &mut impl EventSink,
) {
    let key = naming::label(tag, id);
    match result {
        Ok(()) => {
            summary.applied += 1;
            sink.emit(&AppEvent::ConfigSaved { key });
        }
        Err(e) => {
            summary.failed += 1;
            warn!("Config: writing {} failed: {}", key, e);
            sink.emit(&AppEvent::ConfigFailed { key });
        }
    }
}

fn tally_restore(
    summary: &mut PersistSummary,
    tag: ObjectTag,
    id: SlotId,
    result: crate::error::Result<Restore>,
    sink: &mut impl EventSink,
) {
    let key = naming::label(tag, id);
    match result {
        Ok(Restore::Applied) => {
            summary.applied += 1;
            sink.emit(&AppEvent::ConfigRestored { key });
        }
        Ok(Restore::NotFound) => summary.not_found += 1,
        Ok(Restore::TypeMismatch { stored, live }) => {
            summary.mismatched += 1;
            sink.emit(&AppEvent::ConfigTypeMismatch { key, stored, live });
        }
        Err(e) => {
            summary.failed += 1;
            warn!("Config: reading {} failed: {}", key, e);
            sink.emit(&AppEvent::ConfigFailed { key });
        }
    }
}
