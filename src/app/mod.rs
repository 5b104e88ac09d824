//! Application core: pure domain logic, zero I/O.
//!
//! [`service::Aquarium`] owns the registries and runs control cycles.
//! All interaction with storage, clocks and uplinks happens through the
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
pub mod status;
