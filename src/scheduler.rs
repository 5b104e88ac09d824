//! Run-loop scheduler.
//!
//! Decides *when* a control cycle runs; [`Aquarium::run_cycle`] decides
//! *what* happens in it.  Both scheduling modes execute the identical
//! cycle, so controller decisions do not depend on the mode.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Trigger Sources                          │
//! │                                                              │
//! │  ┌──────────────────────┐        ┌─────────────────────────┐ │
//! │  │ esp_timer callback   │        │ main loop iteration     │ │
//! │  │ CONTROL_TICK.signal()│        │                         │ │
//! │  └──────────┬───────────┘        └────────────┬────────────┘ │
//! │             ▼                                 ▼              │
//! │       TimerTrigger                      PollingTrigger       │
//! │             └────────────────┬────────────────┘              │
//! │                              ▼                               │
//! │                       Scheduler::step                        │
//! │               Aquarium::run_cycle → events                   │
//! │               telemetry flush (interval-gated)               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ClockPort, EventSink, TelemetrySink};
use crate::app::service::{Aquarium, CycleReport};
use crate::config::{SchedulingMode, SystemConfig};
use crate::drivers::hw_timer::TickSignal;

// ═══════════════════════════════════════════════════════════════
//  Triggers
// ═══════════════════════════════════════════════════════════════

/// Answers "is a cycle due now?" once per main-loop iteration.
pub trait CycleTrigger {
    fn mode(&self) -> SchedulingMode;

    /// Consume one pending tick.  Returns `true` if a cycle should run.
    fn poll(&mut self) -> bool;
}

/// Runs a cycle on every poll.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollingTrigger;

impl CycleTrigger for PollingTrigger {
    fn mode(&self) -> SchedulingMode {
        SchedulingMode::Polling
    }

    fn poll(&mut self) -> bool {
        true
    }
}

/// Runs a cycle once per raised timer tick.
pub struct TimerTrigger {
    tick: &'static TickSignal,
}

impl TimerTrigger {
    pub fn new(tick: &'static TickSignal) -> Self {
        Self { tick }
    }
}

impl CycleTrigger for TimerTrigger {
    fn mode(&self) -> SchedulingMode {
        SchedulingMode::Timer
    }

    fn poll(&mut self) -> bool {
        self.tick.try_take().is_some()
    }
}

/// The trigger selected by configuration at startup.
pub enum Trigger {
    Polling(PollingTrigger),
    Timer(TimerTrigger),
}

impl Trigger {
    pub fn from_config(config: &SystemConfig, tick: &'static TickSignal) -> Self {
        match config.scheduling_mode {
            SchedulingMode::Polling => Self::Polling(PollingTrigger),
            SchedulingMode::Timer => Self::Timer(TimerTrigger::new(tick)),
        }
    }
}

impl CycleTrigger for Trigger {
    fn mode(&self) -> SchedulingMode {
        match self {
            Self::Polling(t) => t.mode(),
            Self::Timer(t) => t.mode(),
        }
    }

    fn poll(&mut self) -> bool {
        match self {
            Self::Polling(t) => t.poll(),
            Self::Timer(t) => t.poll(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler<T = Trigger> {
    trigger: T,
    telemetry_enabled: bool,
    telemetry_interval_ms: u64,
    last_flush_ms: u64,
}

impl<T: CycleTrigger> Scheduler<T> {
    pub fn new(trigger: T, config: &SystemConfig) -> Self {
        Self {
            trigger,
            telemetry_enabled: config.telemetry_enabled,
            telemetry_interval_ms: u64::from(config.telemetry_interval_secs) * 1000,
            last_flush_ms: 0,
        }
    }

    pub fn mode(&self) -> SchedulingMode {
        self.trigger.mode()
    }

    /// Emit the startup event.
    pub fn start(&self, aquarium: &Aquarium, sink: &mut impl EventSink) {
        info!("Scheduler started in {:?} mode", self.mode());
        sink.emit(&AppEvent::Started {
            mode: self.mode(),
            controllers: aquarium.nr_of_controllers(),
            actuators: aquarium.nr_of_actuators(),
            sensors: aquarium.nr_of_sensors(),
        });
    }

    /// One main-loop iteration.  Returns the cycle report if a cycle ran.
    pub fn step(
        &mut self,
        aquarium: &mut Aquarium,
        clock: &impl ClockPort,
        telemetry: &mut impl TelemetrySink,
        sink: &mut impl EventSink,
    ) -> Option<CycleReport> {
        if !self.trigger.poll() {
            return None;
        }

        let now = clock.uptime_ms();
        let report = aquarium.run_cycle(now, clock.time_of_day());
        debug!(
            "Cycle {}: {} sensors, {} run / {} skipped / {} latched, {} switches",
            report.cycle,
            report.sensors_read,
            report.controllers_run,
            report.controllers_skipped,
            report.controllers_latched,
            report.switches.len()
        );

        for &(sensor, error) in &report.sensor_failures {
            sink.emit(&AppEvent::SensorReadFailed { sensor, error });
        }
        for s in &report.switches {
            sink.emit(&AppEvent::ActuatorSwitched {
                actuator: s.actuator,
                controller: s.controller,
                on: s.on,
            });
        }

        if self.telemetry_enabled && now.wrapping_sub(self.last_flush_ms) >= self.telemetry_interval_ms
        {
            self.flush_telemetry(aquarium, now, telemetry, sink);
        }

        Some(report)
    }

    /// Hand every buffered sample to the uplink.  Samples are discarded
    /// only after the uplink accepted them.
    pub fn flush_telemetry(
        &mut self,
        aquarium: &mut Aquarium,
        now: u64,
        telemetry: &mut impl TelemetrySink,
        sink: &mut impl EventSink,
    ) {
        self.last_flush_ms = now;
        let batch = aquarium.telemetry_snapshot();
        if batch.is_empty() {
            return;
        }
        match telemetry.publish(&batch) {
            Ok(()) => {
                aquarium.discard_telemetry(batch.len());
                sink.emit(&AppEvent::TelemetryFlushed {
                    samples: batch.len(),
                });
            }
            Err(e) => {
                warn!("Telemetry: {} ({} samples kept)", e, batch.len());
                sink.emit(&AppEvent::TelemetryFailed(e));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
