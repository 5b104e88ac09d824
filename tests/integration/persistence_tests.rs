//! Integration tests for saving and restoring a whole aquarium through
//! the configuration store.

use aquanode::actuators::pwm_output::PwmOutput;
use aquanode::adapters::nvs::NvsAdapter;
use aquanode::adapters::sd_card::SdCardStorage;
use aquanode::app::events::AppEvent;
use aquanode::app::ports::{ConfigError, ConfigPort, StoragePort};
use aquanode::app::service::Aquarium;
use aquanode::config::{DEFAULT_NAMESPACE, SchedulingMode, SystemConfig};
use aquanode::controllers::level::LevelController;
use aquanode::controllers::temperature::TemperatureController;
use aquanode::persistence::{ConfigRecord, ConfigStore, Restore};
use aquanode::registry::SlotId;

use crate::mock_hw::{MemStorage, MockRelay, RecordingSink, ScriptedSensor};

/// PWM channel that accepts every duty cycle.
struct Dimmer;

impl embedded_hal::pwm::ErrorType for Dimmer {
    type Error = core::convert::Infallible;
}

impl embedded_hal::pwm::SetDutyCycle for Dimmer {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A tank as `main` would build it, with every object at its defaults.
fn build_tank(sink: &mut RecordingSink) -> Aquarium {
    let mut aq = Aquarium::new();
    aq.add_sensor("Water", Box::new(ScriptedSensor::default()), sink);
    aq.add_actuator("Heater", Box::new(MockRelay::default()), sink);
    aq.add_actuator("Light", Box::new(PwmOutput::new(Dimmer).unwrap()), sink);
    aq.add_controller("Thermostat", Box::new(TemperatureController::new()), sink);
    aq
}

#[test]
fn whole_tank_round_trip() {
    let mut sink = RecordingSink::new();
    let mut store = ConfigStore::new(MemStorage::new());

    // Configure and save.
    let mut aq = build_tank(&mut sink);
    let s = SlotId::new(0);
    let heater = SlotId::new(0);
    let light = SlotId::new(1);
    let c = SlotId::new(0);
    aq.assign_actuator(heater, c).unwrap();
    aq.actuator_mut(light).unwrap().device_mut().set_pwm(0.25).unwrap();
    aq.actuator_mut(light).unwrap().set_name("Moon LED");
    let saved = aq.save_all(&mut store, &mut sink);
    assert_eq!(saved.applied, 4);
    assert_eq!(saved.failed, 0);
    assert!(store.storage().exists(DEFAULT_NAMESPACE, "C0"));
    assert!(store.storage().exists(DEFAULT_NAMESPACE, "A1"));
    assert!(store.storage().exists(DEFAULT_NAMESPACE, "S0"));

    // A freshly booted tank picks everything up again.
    let mut rebooted = build_tank(&mut sink);
    let restored = rebooted.restore_all(&store, &mut sink);
    assert_eq!(restored.applied, 4);
    assert_eq!(restored.not_found, 0);
    assert_eq!(rebooted.controller_of(heater), Some(c));
    assert_eq!(rebooted.actuator(light).unwrap().name(), "Moon LED");
    // Restored duty applies once the light is switched on.
    rebooted.actuator_mut(light).unwrap().switch(true).unwrap();
    assert!((rebooted.actuator(light).unwrap().device().pwm() - 0.25).abs() < 1e-6);
    assert_eq!(rebooted.sensor(s).unwrap().name(), "Water");
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ConfigRestored { .. })),
        4
    );
}

#[test]
fn fresh_storage_keeps_defaults() {
    let mut sink = RecordingSink::new();
    let store = ConfigStore::new(MemStorage::new());
    let mut aq = build_tank(&mut sink);
    let summary = aq.restore_all(&store, &mut sink);
    assert_eq!(summary.applied, 0);
    assert_eq!(summary.not_found, 4);
    assert_eq!(aq.actuator(SlotId::new(0)).unwrap().controller(), SlotId::UNASSIGNED);
}

#[test]
fn type_mismatch_keeps_defaults_and_is_reported() {
    let mut sink = RecordingSink::new();
    let mut store = ConfigStore::new(MemStorage::new());

    // Slot C0 used to hold a thermostat...
    let mut before = Aquarium::new();
    let mut thermostat = TemperatureController::new();
    thermostat.assign_sensor(SlotId::new(5));
    before.add_controller("Thermostat", Box::new(thermostat), &mut sink);
    before.save_all(&mut store, &mut sink);

    // ...but the new firmware puts a level controller there.
    let mut after = Aquarium::new();
    let c = after
        .add_controller("Top-off", Box::new(LevelController::new()), &mut sink)
        .unwrap();
    let summary = after.restore_all(&store, &mut sink);
    assert_eq!(summary.mismatched, 1);
    assert_eq!(summary.applied, 0);
    assert_eq!(after.controller(c).unwrap().name(), "Top-off");
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ConfigTypeMismatch { key, stored: 1, live: 2 } if key == "C0"
    )));

    let slot = after.controller_mut(c).unwrap();
    assert_eq!(store.read_controller(c, slot).unwrap(), Restore::TypeMismatch { stored: 1, live: 2 });
}

#[test]
fn corrupted_record_fails_without_touching_the_object() {
    let mut sink = RecordingSink::new();
    let mut store = ConfigStore::new(MemStorage::new());
    store.storage_mut().poke(DEFAULT_NAMESPACE, "A0", &[0xFF, 0xFF, 0xFF]);

    let mut aq = build_tank(&mut sink);
    aq.assign_actuator(SlotId::new(0), SlotId::new(0)).unwrap();
    let summary = aq.restore_all(&store, &mut sink);
    assert_eq!(summary.failed, 1);
    assert_eq!(aq.controller_of(SlotId::new(0)), Some(SlotId::new(0)));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ConfigFailed { key } if key == "A0"
    )));
}

#[test]
fn forget_removes_record() {
    let mut sink = RecordingSink::new();
    let mut store = ConfigStore::new(MemStorage::new());
    let aq = build_tank(&mut sink);
    aq.save_all(&mut store, &mut sink);
    store
        .forget(aquanode::naming::ObjectTag::Actuator, SlotId::new(1))
        .unwrap();
    assert!(!store.storage().exists(DEFAULT_NAMESPACE, "A1"));
    assert!(store.read_record("A1").unwrap().is_none());
}

// ── System config ─────────────────────────────────────────────

#[test]
fn system_config_round_trip() {
    let mut store = ConfigStore::new(MemStorage::new());
    assert_eq!(store.load().unwrap(), SystemConfig::default());

    let cfg = SystemConfig {
        scheduling_mode: SchedulingMode::Polling,
        control_interval_ms: 500,
        telemetry_enabled: true,
        telemetry_interval_secs: 30,
    };
    store.save(&cfg).unwrap();
    assert_eq!(store.load().unwrap(), cfg);
}

#[test]
fn invalid_system_config_is_rejected_not_clamped() {
    let mut store = ConfigStore::new(MemStorage::new());
    let cfg = SystemConfig {
        control_interval_ms: 10,
        ..SystemConfig::default()
    };
    assert!(matches!(store.save(&cfg), Err(ConfigError::ValidationFailed(_))));
    assert_eq!(store.storage().writes, 0);
}

#[test]
fn system_record_of_wrong_type_falls_back_to_defaults() {
    let mut store = ConfigStore::new(MemStorage::new());
    let record = ConfigRecord::new(0x01, "not a config");
    store.write_record("aqua", &record).unwrap();
    assert_eq!(store.load().unwrap(), SystemConfig::default());
}

// ── Real storage adapters ─────────────────────────────────────

#[test]
fn nvs_backend_round_trip() {
    let mut sink = RecordingSink::new();
    let mut store = ConfigStore::new(NvsAdapter::new().unwrap());
    let mut aq = build_tank(&mut sink);
    aq.assign_actuator(SlotId::new(0), SlotId::new(0)).unwrap();
    aq.save_all(&mut store, &mut sink);

    let mut rebooted = build_tank(&mut sink);
    assert_eq!(rebooted.restore_all(&store, &mut sink).applied, 4);
    assert_eq!(rebooted.controller_of(SlotId::new(0)), Some(SlotId::new(0)));
}

#[test]
fn sd_card_backend_round_trip() {
    let root = std::env::temp_dir().join(format!("aquanode-it-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&root);

    let mut sink = RecordingSink::new();
    let mut store = ConfigStore::new(SdCardStorage::new(&root));
    let mut aq = build_tank(&mut sink);
    aq.assign_actuator(SlotId::new(0), SlotId::new(0)).unwrap();
    assert_eq!(aq.save_all(&mut store, &mut sink).failed, 0);
    assert!(root.join(DEFAULT_NAMESPACE).join("C0.cfg").is_file());

    let store = ConfigStore::new(SdCardStorage::new(&root));
    let mut rebooted = build_tank(&mut sink);
    assert_eq!(rebooted.restore_all(&store, &mut sink).applied, 4);
    assert_eq!(rebooted.controller_of(SlotId::new(0)), Some(SlotId::new(0)));

    let _ = std::fs::remove_dir_all(&root);
}
