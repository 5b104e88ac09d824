//! Outbound application events.
//!
//! The [`Aquarium`](super::service::Aquarium) and the
//! [`Scheduler`](crate::scheduler::Scheduler) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, push to a web UI.

use crate::config::SchedulingMode;
use crate::error::SensorError;
use crate::naming::{Label, Name, ObjectTag};
use crate::registry::SlotId;

use super::ports::TelemetryError;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The run loop is about to start.
    Started {
        mode: SchedulingMode,
        controllers: usize,
        actuators: usize,
        sensors: usize,
    },

    /// A registry was full; the object was not added.
    CapacityExhausted { kind: ObjectTag, name: Name },

    /// A stored record was applied to a live object.
    ConfigRestored { key: Label },

    /// A stored record belongs to a different object type; defaults kept.
    ConfigTypeMismatch { key: Label, stored: u8, live: u8 },

    /// A record was written.
    ConfigSaved { key: Label },

    /// A record could not be read, decoded or written.
    ConfigFailed { key: Label },

    /// A controller changed an actuator's output.
    ActuatorSwitched {
        actuator: SlotId,
        controller: SlotId,
        on: bool,
    },

    /// A sensor read failed; its last good value is kept.
    SensorReadFailed { sensor: SlotId, error: SensorError },

    /// Buffered samples were handed to the telemetry uplink.
    TelemetryFlushed { samples: usize },

    /// The uplink refused the batch; samples stay buffered.
    TelemetryFailed(TelemetryError),
}
