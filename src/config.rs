//! System configuration parameters
//!
//! Board-level tunables for the aquarium controller.  Controller,
//! actuator and sensor parameters are persisted per slot by
//! [`ConfigStore`](crate::persistence::ConfigStore); this record holds
//! only what the run loop itself needs.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Namespace under which every configuration record is stored.
pub const DEFAULT_NAMESPACE: &str = "config";

/// How control cycles are triggered.  Exactly one mode is active for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// Run a cycle on every main-loop iteration; no period guarantee.
    Polling,
    /// Run a cycle each time the periodic hardware timer fires.
    Timer,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Scheduling ---
    /// Trigger style for control cycles.
    pub scheduling_mode: SchedulingMode,
    /// Hardware timer period in milliseconds (timer mode only).
    pub control_interval_ms: u32,

    // --- Telemetry ---
    /// Push buffered readings to the telemetry uplink.
    pub telemetry_enabled: bool,
    /// Minimum time between telemetry flushes (seconds).
    pub telemetry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            scheduling_mode: SchedulingMode::Timer,
            control_interval_ms: 1000, // 1 Hz
            telemetry_enabled: false,
            telemetry_interval_secs: 60, // 1/min
        }
    }
}

/// Range-check every field.  Used by every [`ConfigPort`](crate::app::ports::ConfigPort)
/// implementation before persisting.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(100..=60_000).contains(&cfg.control_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "control_interval_ms must be 100–60000",
        ));
    }
    if !(5..=3600).contains(&cfg.telemetry_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "telemetry_interval_secs must be 5–3600",
        ));
    }
    if u64::from(cfg.control_interval_ms) > u64::from(cfg.telemetry_interval_secs) * 1000 {
        return Err(ConfigError::ValidationFailed(
            "control_interval_ms must not exceed the telemetry interval",
        ));
    }
    Ok(())
}
