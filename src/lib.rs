//! aquanode firmware library.
//!
//! Exposes the control core (registries, controllers, scheduler,
//! persistence) for integration testing and for the ESP-IDF binary.
//! All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod actuators;
pub mod adapters;
pub mod app;
pub mod assignment;
pub mod config;
pub mod controllers;
pub mod drivers;
pub mod error;
pub mod naming;
pub mod persistence;
pub mod pins;
pub mod registry;
pub mod scheduler;
pub mod sensors;
