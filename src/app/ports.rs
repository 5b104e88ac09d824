//! Port traits: the boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Aquarium (domain)
//! ```
//!
//! Driven adapters (storage, telemetry uplink, clock, event sinks)
//! implement these traits.  The [`Aquarium`](super::service::Aquarium)
//! and [`Scheduler`](crate::scheduler::Scheduler) consume them through
//! generics, so the core never touches a filesystem, a socket or a
//! hardware clock directly.

use crate::config::SystemConfig;
use crate::registry::SlotId;

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / SD card)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for configuration records.
///
/// - Keys are namespaced so several subsystems can share one medium.
/// - Writes replace the whole value; a reader never sees a half record.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value, replacing any previous one.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the board-level [`SystemConfig`].
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] instead of clamping.
pub trait ConfigPort {
    /// Load configuration.  Returns [`SystemConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Telemetry port (driven adapter: domain → cloud / log)
// ───────────────────────────────────────────────────────────────

/// One buffered sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub sensor: SlotId,
    pub value: f64,
    pub uptime_ms: u64,
}

/// Uplink for buffered sensor readings.  The scheduler calls this at
/// most once per telemetry interval.
pub trait TelemetrySink {
    fn publish(&mut self, samples: &[TelemetrySample]) -> Result<(), TelemetryError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock time of day, as needed by clock-timer rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    /// 0–23.
    pub hour: u8,
    /// 0–59.
    pub minute: u8,
    /// 0 = Monday … 6 = Sunday.
    pub weekday: u8,
}

impl TimeOfDay {
    /// Minutes since midnight (0–1439).
    pub fn minute_of_day(self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }
}

/// Time source for the run loop.
pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    /// Local time of day, or `None` while the wall clock is not synced.
    fn time_of_day(&self) -> Option<TimeOfDay>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage medium is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// The stored value does not fit the caller's buffer.
    BufferTooSmall,
}

/// Errors from [`TelemetrySink`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The uplink is not connected.
    Offline,
    /// The remote end refused the batch.
    Rejected,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::BufferTooSmall => write!(f, "value larger than buffer"),
        }
    }
}

impl core::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Offline => write!(f, "uplink offline"),
            Self::Rejected => write!(f, "batch rejected"),
        }
    }
}
