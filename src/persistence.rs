//! Configuration persistence façade.
//!
//! Every controller, actuator and sensor slot persists to one record keyed
//! by its label (`C0`, `A12`, `S3`).  The board-level [`SystemConfig`]
//! lives under the key `aqua`.  All records share one envelope:
//!
//! ```text
//!   ConfigRecord (postcard)
//!   ┌─────────────┬────────────┬──────────┬────────┬──────┬──────────────┐
//!   │ object_type │ controller │ actuator │ sensor │ name │ payload ≤ 96 │
//!   │     u8      │     i8     │    i8    │   i8   │ str  │    bytes     │
//!   └─────────────┴────────────┴──────────┴────────┴──────┴──────────────┘
//! ```
//!
//! `object_type` is the live object's kind tag.  A record whose tag does
//! not match the object it is being restored into is discarded and the
//! object keeps its defaults.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::actuators::ActuatorSlot;
use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{DEFAULT_NAMESPACE, SystemConfig, validate_config};
use crate::controllers::ControllerSlot;
use crate::error::{CodecError, Error, Result};
use crate::naming::{self, Label, Name, ObjectTag};
use crate::registry::SlotId;
use crate::sensors::SensorSlot;

/// Maximum encoded parameter block per object.
pub const PAYLOAD_CAPACITY: usize = 96;

/// Upper bound of one encoded [`ConfigRecord`].
pub const RECORD_CAPACITY: usize = 128;

/// Storage key of the system record.
pub const SYSTEM_KEY: &str = "aqua";

/// Type tag of the system record.
pub const SYSTEM_OBJECT_TYPE: u8 = 0xA0;

pub type Payload = heapless::Vec<u8, PAYLOAD_CAPACITY>;

/// On-storage envelope shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub object_type: u8,
    pub controller: SlotId,
    pub actuator: SlotId,
    pub sensor: SlotId,
    pub name: Name,
    pub payload: Payload,
}

impl ConfigRecord {
    /// Envelope for `object_type` with every reference unassigned.
    pub fn new(object_type: u8, name: &str) -> Self {
        Self {
            object_type,
            controller: SlotId::UNASSIGNED,
            actuator: SlotId::UNASSIGNED,
            sensor: SlotId::UNASSIGNED,
            name: naming::name_from(name),
            payload: Payload::new(),
        }
    }

    /// Fill the payload with `serialize`'s output.
    fn with_payload(
        mut self,
        serialize: impl FnOnce(&mut [u8]) -> core::result::Result<usize, CodecError>,
    ) -> core::result::Result<Self, CodecError> {
        let mut buf = [0u8; PAYLOAD_CAPACITY];
        let n = serialize(&mut buf)?;
        let bytes = buf.get(..n).ok_or(CodecError::BufferTooSmall)?;
        self.payload = Payload::from_slice(bytes).map_err(|()| CodecError::BufferTooSmall)?;
        Ok(self)
    }

    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> core::result::Result<&'b mut [u8], CodecError> {
        Ok(postcard::to_slice(self, buf)?)
    }

    pub fn decode(bytes: &[u8]) -> core::result::Result<Self, CodecError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

/// Outcome of restoring one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// The record was applied.
    Applied,
    /// No record stored; defaults kept.
    NotFound,
    /// The record belongs to another object type; defaults kept.
    TypeMismatch { stored: u8, live: u8 },
}

/// Reads and writes configuration records through a [`StoragePort`].
pub struct ConfigStore<S> {
    storage: S,
    namespace: &'static str,
}

impl<S: StoragePort> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_namespace(storage, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(storage: S, namespace: &'static str) -> Self {
        Self { storage, namespace }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    // ── Controllers ───────────────────────────────────────────

    pub fn write_controller(&mut self, id: SlotId, slot: &ControllerSlot) -> Result<()> {
        let mut record = ConfigRecord::new(slot.kind().tag(), slot.name());
        record.controller = id;
        let record = record.with_payload(|buf| slot.rule().serialize(buf))?;
        self.write_record(&naming::label(ObjectTag::Controller, id), &record)
    }

    pub fn read_controller(&self, id: SlotId, slot: &mut ControllerSlot) -> Result<Restore> {
        let key = naming::label(ObjectTag::Controller, id);
        let Some(record) = self.read_record(&key)? else {
            return Ok(Restore::NotFound);
        };
        if let Some(mismatch) = check_type(&key, &record, slot.kind().tag()) {
            return Ok(mismatch);
        }
        slot.rule_mut().deserialize(&record.payload)?;
        slot.set_name(&record.name);
        Ok(Restore::Applied)
    }

    // ── Actuators ─────────────────────────────────────────────

    pub fn write_actuator(&mut self, id: SlotId, slot: &ActuatorSlot) -> Result<()> {
        let mut record = ConfigRecord::new(slot.kind().tag(), slot.name());
        record.actuator = id;
        record.controller = slot.controller();
        let record = record.with_payload(|buf| slot.device().serialize(buf))?;
        self.write_record(&naming::label(ObjectTag::Actuator, id), &record)
    }

    /// Restores name, driver parameters and the controller
    /// back-reference.
    pub fn read_actuator(&self, id: SlotId, slot: &mut ActuatorSlot) -> Result<Restore> {
        let key = naming::label(ObjectTag::Actuator, id);
        let Some(record) = self.read_record(&key)? else {
            return Ok(Restore::NotFound);
        };
        if let Some(mismatch) = check_type(&key, &record, slot.kind().tag()) {
            return Ok(mismatch);
        }
        slot.device_mut().deserialize(&record.payload)?;
        slot.set_name(&record.name);
        slot.assign_controller(record.controller);
        Ok(Restore::Applied)
    }

    // ── Sensors ───────────────────────────────────────────────

    pub fn write_sensor(&mut self, id: SlotId, slot: &SensorSlot) -> Result<()> {
        let mut record = ConfigRecord::new(slot.kind().tag(), slot.name());
        record.sensor = id;
        let record = record.with_payload(|buf| slot.device().serialize(buf))?;
        self.write_record(&naming::label(ObjectTag::Sensor, id), &record)
    }

    pub fn read_sensor(&self, id: SlotId, slot: &mut SensorSlot) -> Result<Restore> {
        let key = naming::label(ObjectTag::Sensor, id);
        let Some(record) = self.read_record(&key)? else {
            return Ok(Restore::NotFound);
        };
        if let Some(mismatch) = check_type(&key, &record, slot.kind().tag()) {
            return Ok(mismatch);
        }
        slot.device_mut().deserialize(&record.payload)?;
        slot.set_name(&record.name);
        Ok(Restore::Applied)
    }

    /// Delete the record of a freed slot.
    pub fn forget(&mut self, tag: ObjectTag, id: SlotId) -> Result<()> {
        let key = naming::label(tag, id);
        Ok(self.storage.delete(self.namespace, &key)?)
    }

    // ── Raw records ───────────────────────────────────────────

    /// Encode fully before touching storage, so a codec failure never
    /// leaves a partial record behind.
    pub fn write_record(&mut self, key: &str, record: &ConfigRecord) -> Result<()> {
        let mut buf = [0u8; RECORD_CAPACITY];
        let bytes = record.encode(&mut buf)?;
        self.storage.write(self.namespace, key, bytes)?;
        debug!("Config: wrote {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    /// `Ok(None)` when the key is not stored.
    pub fn read_record(&self, key: &str) -> Result<Option<ConfigRecord>> {
        let mut buf = [0u8; RECORD_CAPACITY];
        let n = match self.storage.read(self.namespace, key, &mut buf) {
            Ok(n) => n,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let bytes = buf.get(..n).ok_or(Error::Codec(CodecError::BufferTooSmall))?;
        Ok(Some(ConfigRecord::decode(bytes)?))
    }
}

fn check_type(key: &Label, record: &ConfigRecord, live: u8) -> Option<Restore> {
    if record.object_type == live {
        return None;
    }
    warn!(
        "Config: {} holds type {:#04x}, live object is {:#04x}; keeping defaults",
        key, record.object_type, live
    );
    Some(Restore::TypeMismatch {
        stored: record.object_type,
        live,
    })
}

impl<S: StoragePort> ConfigPort for ConfigStore<S> {
    fn load(&self) -> core::result::Result<SystemConfig, ConfigError> {
        let record = match self.read_record(SYSTEM_KEY) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(SystemConfig::default()),
            Err(Error::Codec(_)) => return Err(ConfigError::Corrupted),
            Err(_) => return Err(ConfigError::IoError),
        };
        if record.object_type != SYSTEM_OBJECT_TYPE {
            warn!("Config: {} is not a system record; using defaults", SYSTEM_KEY);
            return Ok(SystemConfig::default());
        }
        let config: SystemConfig =
            postcard::from_bytes(&record.payload).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&config)?;
        Ok(config)
    }

    fn save(&mut self, config: &SystemConfig) -> core::result::Result<(), ConfigError> {
        validate_config(config)?;
        let record = ConfigRecord::new(SYSTEM_OBJECT_TYPE, "aquanode")
            .with_payload(|buf| Ok(postcard::to_slice(config, buf)?.len()))
            .map_err(|_| ConfigError::Corrupted)?;
        self.write_record(SYSTEM_KEY, &record).map_err(|_| ConfigError::IoError)
    }
}
