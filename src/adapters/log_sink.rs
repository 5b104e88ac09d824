//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC in production).  It also doubles as a
//! [`TelemetrySink`] for boards without a network uplink: samples are
//! printed as one `TELEM |` line per flush.

use core::fmt::Write as _;

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, TelemetryError, TelemetrySample, TelemetrySink};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                mode,
                controllers,
                actuators,
                sensors,
            } => {
                info!(
                    "START | mode={:?} | controllers={} actuators={} sensors={}",
                    mode, controllers, actuators, sensors
                );
            }
            AppEvent::CapacityExhausted { kind, name } => {
                warn!("SLOTS | {:?} registry full, '{}' not added", kind, name);
            }
            AppEvent::ConfigRestored { key } => {
                info!("CONFIG | {} restored", key);
            }
            AppEvent::ConfigTypeMismatch { key, stored, live } => {
                warn!(
                    "CONFIG | {} type mismatch (stored=0x{:02X} live=0x{:02X}), defaults kept",
                    key, stored, live
                );
            }
            AppEvent::ConfigSaved { key } => {
                info!("CONFIG | {} saved", key);
            }
            AppEvent::ConfigFailed { key } => {
                warn!("CONFIG | {} failed", key);
            }
            AppEvent::ActuatorSwitched {
                actuator,
                controller,
                on,
            } => {
                info!(
                    "ACT | A{} -> {} (by C{})",
                    actuator,
                    if *on { "ON" } else { "OFF" },
                    controller
                );
            }
            AppEvent::SensorReadFailed { sensor, error } => {
                warn!("SENSOR | S{} read failed: {}", sensor, error);
            }
            AppEvent::TelemetryFlushed { samples } => {
                info!("TELEM | flushed {} samples", samples);
            }
            AppEvent::TelemetryFailed(e) => {
                warn!("TELEM | flush failed: {}", e);
            }
        }
    }
}

impl TelemetrySink for LogEventSink {
    fn publish(&mut self, samples: &[TelemetrySample]) -> Result<(), TelemetryError> {
        let mut line: heapless::String<256> = heapless::String::new();
        for s in samples {
            // A full line is flushed and a fresh one started.
            let mark = line.len();
            if write!(line, " S{}={:.2}", s.sensor, s.value).is_err() {
                line.truncate(mark);
                info!("TELEM |{}", line);
                line.clear();
                let _ = write!(line, " S{}={:.2}", s.sensor, s.value);
            }
        }
        if !line.is_empty() {
            info!("TELEM |{}", line);
        }
        Ok(())
    }
}
