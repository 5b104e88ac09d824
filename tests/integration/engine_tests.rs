//! Integration tests for the Aquarium → controllers → actuators pipeline.
//!
//! Devices are the crate's real embedded-hal drivers on top of mock pins,
//! so a test observes pin levels exactly as the relay board would.

use aquanode::actuators::digital_output::DigitalOutput;
use aquanode::app::events::AppEvent;
use aquanode::app::service::Aquarium;
use aquanode::controllers::clock_timer::{ClockTimerController, TimeWindow};
use aquanode::controllers::level::LevelController;
use aquanode::controllers::temperature::TemperatureController;
use aquanode::error::SensorError;
use aquanode::naming::ObjectTag;
use aquanode::registry::SlotId;
use aquanode::sensors::digital_input::DigitalInput;

use crate::mock_hw::{MockPin, MockRelay, RecordingSink, ScriptedSensor};

fn relay_on_pin(aq: &mut Aquarium, name: &str, sink: &mut RecordingSink) -> (SlotId, MockPin) {
    let pin = MockPin::default();
    let device = DigitalOutput::new(pin.clone()).unwrap();
    let id = aq.add_actuator(name, Box::new(device), sink).unwrap();
    (id, pin)
}

// ── Thermostat end to end ─────────────────────────────────────

#[test]
fn thermostat_drives_heater_and_chiller_pins() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();

    let probe = ScriptedSensor::reading(25.0);
    let s = aq.add_sensor("Water", Box::new(probe.clone()), &mut sink).unwrap();
    let (heater, heater_pin) = relay_on_pin(&mut aq, "Heater", &mut sink);
    let (chiller, chiller_pin) = relay_on_pin(&mut aq, "Chiller", &mut sink);

    let mut rule = TemperatureController::new();
    rule.assign_sensor(s);
    rule.assign_heating_actuator(heater);
    rule.assign_cooling_actuator(chiller);
    let c = aq.add_controller("Thermostat", Box::new(rule), &mut sink).unwrap();
    aq.assign_actuator(heater, c).unwrap();
    aq.assign_actuator(chiller, c).unwrap();

    let mut step = |t: f64| {
        probe.set(t);
        aq.run_cycle(0, None);
        (heater_pin.high.get(), chiller_pin.high.get())
    };

    assert_eq!(step(25.0), (false, false));
    assert_eq!(step(23.0), (true, false));
    assert_eq!(step(24.4), (true, false));
    assert_eq!(step(24.6), (false, false));
    assert_eq!(step(27.0), (false, true));
    assert_eq!(step(25.6), (false, true));
    assert_eq!(step(25.4), (false, false));
    // Straight across the band.
    assert_eq!(step(27.0), (false, true));
    assert_eq!(step(20.0), (true, false));
}

#[test]
fn cycle_report_lists_switches_in_order() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let probe = ScriptedSensor::reading(10.0);
    let s = aq.add_sensor("Water", Box::new(probe), &mut sink).unwrap();
    let (heater, _) = relay_on_pin(&mut aq, "Heater", &mut sink);

    let mut rule = TemperatureController::new();
    rule.assign_sensor(s);
    rule.assign_heating_actuator(heater);
    let c = aq.add_controller("Thermostat", Box::new(rule), &mut sink).unwrap();
    aq.assign_actuator(heater, c).unwrap();

    let report = aq.run_cycle(0, None);
    assert_eq!(report.cycle, 1);
    assert_eq!(report.sensors_read, 1);
    assert_eq!(report.controllers_run, 1);
    assert_eq!(report.switches.len(), 1);
    assert_eq!(report.switches[0].actuator, heater);
    assert_eq!(report.switches[0].controller, c);
    assert!(report.switches[0].on);

    // Steady state: no further switching.
    let report = aq.run_cycle(1000, None);
    assert!(report.switches.is_empty());
}

// ── Assignment through the service ────────────────────────────

#[test]
fn assignment_groups_follow_back_references() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let c0 = aq
        .add_controller("a", Box::new(TemperatureController::new()), &mut sink)
        .unwrap();
    let c1 = aq
        .add_controller("b", Box::new(TemperatureController::new()), &mut sink)
        .unwrap();

    let owners = [Some(c0), None, Some(c0), Some(c1), Some(c0)];
    for (i, owner) in owners.iter().enumerate() {
        let id = aq
            .add_actuator("relay", Box::new(MockRelay::default()), &mut sink)
            .unwrap();
        assert_eq!(id, SlotId::from_index(i));
        if let Some(c) = owner {
            aq.assign_actuator(id, *c).unwrap();
        }
    }

    let mut out = [SlotId::UNASSIGNED; 8];
    let n = aq.assigned_actuator_ids(c0, &mut out);
    assert_eq!(n, 3);
    assert_eq!(&out[..3], &[SlotId::new(0), SlotId::new(2), SlotId::new(4)]);

    let n = aq.assigned_actuator_ids(c1, &mut out);
    assert_eq!(n, 1);
    assert_eq!(out[0], SlotId::new(3));

    let mut short = [SlotId::UNASSIGNED; 2];
    assert_eq!(aq.assigned_actuator_ids(c0, &mut short), 3);
    assert_eq!(short, [SlotId::new(0), SlotId::new(2)]);

    // The unassigned actuator belongs to nobody, not to "controller -1".
    assert_eq!(aq.controller_of(SlotId::new(1)), None);
    assert_eq!(aq.assigned_actuator_ids(SlotId::UNASSIGNED, &mut out), 0);

    // Object form agrees with the id form.
    let slot = aq.controller(c0).unwrap();
    let mut objs = [None; 8];
    assert_eq!(aq.assigned_actuators(slot, &mut objs), 3);
    assert!(objs[..3].iter().all(|a| a.map(|a| a.controller()) == Some(c0)));
}

#[test]
fn removing_a_controller_detaches_its_actuators() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let c = aq
        .add_controller("old", Box::new(TemperatureController::new()), &mut sink)
        .unwrap();
    let a = aq
        .add_actuator("relay", Box::new(MockRelay::default()), &mut sink)
        .unwrap();
    aq.assign_actuator(a, c).unwrap();

    aq.remove_controller(c).unwrap();
    assert_eq!(aq.actuator(a).unwrap().controller(), SlotId::UNASSIGNED);

    let reused = aq
        .add_controller("new", Box::new(TemperatureController::new()), &mut sink)
        .unwrap();
    assert_eq!(reused, c);
    let mut out = [SlotId::UNASSIGNED; 4];
    assert_eq!(aq.assigned_actuator_ids(reused, &mut out), 0);
}

#[test]
fn full_sensor_registry_reports_capacity() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    while aq
        .add_sensor("probe", Box::new(ScriptedSensor::default()), &mut sink)
        .is_some()
    {}
    assert_eq!(aq.nr_of_sensors(), aquanode::sensors::MAX_SENSORS);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::CapacityExhausted {
                kind: ObjectTag::Sensor,
                ..
            }
        )),
        1
    );
}

// ── Sensor failures ───────────────────────────────────────────

#[test]
fn failed_read_keeps_last_good_value() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let probe = ScriptedSensor::reading(22.5);
    let s = aq.add_sensor("Water", Box::new(probe.clone()), &mut sink).unwrap();

    aq.run_cycle(0, None);
    assert_eq!(aq.sensor_value(s), Some(22.5));

    probe.fail();
    let report = aq.run_cycle(1000, None);
    assert_eq!(aq.sensor_value(s), Some(22.5));
    assert_eq!(report.sensor_failures.len(), 1);
    assert_eq!(report.sensor_failures[0], (s, SensorError::ProbeNoResponse));
    assert_eq!(probe.reads.get(), 2);

    // Only the fresh reading went to telemetry.
    let samples = aq.telemetry_snapshot();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].uptime_ms, 0);

    probe.set(23.0);
    aq.run_cycle(2000, None);
    assert_eq!(aq.pending_telemetry(), 2);
}

#[test]
fn thermostat_without_reading_leaves_outputs_alone() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let probe = ScriptedSensor::default();
    let s = aq.add_sensor("Water", Box::new(probe), &mut sink).unwrap();
    let relay = MockRelay::default();
    let heater = aq.add_actuator("Heater", Box::new(relay.clone()), &mut sink).unwrap();

    let mut rule = TemperatureController::new();
    rule.assign_sensor(s);
    rule.assign_heating_actuator(heater);
    aq.add_controller("Thermostat", Box::new(rule), &mut sink).unwrap();

    let report = aq.run_cycle(0, None);
    assert_eq!(report.controllers_skipped, 1);
    assert!(relay.commands.borrow().is_empty());
}

#[test]
fn thermostat_cannot_drive_the_refill_pump() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let water = aq
        .add_sensor("Water", Box::new(ScriptedSensor::reading(10.0)), &mut sink)
        .unwrap();
    let (pump, pump_pin) = relay_on_pin(&mut aq, "ATO pump", &mut sink);

    let mut rule = TemperatureController::new();
    rule.assign_sensor(water);
    rule.assign_heating_actuator(pump);
    let thermostat = aq.add_controller("Thermostat", Box::new(rule), &mut sink).unwrap();
    let top_off = aq
        .add_controller("Top-off", Box::new(LevelController::new()), &mut sink)
        .unwrap();
    aq.assign_actuator(pump, top_off).unwrap();

    let report = aq.run_cycle(0, None);
    assert!(report.switches.iter().all(|s| s.controller != thermostat));
    assert!(!pump_pin.high.get());
    assert_eq!(aq.controller_of(pump), Some(top_off));
}

// ── Level controller ──────────────────────────────────────────

#[test]
fn float_switch_refill_timeline() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let float = MockPin::default();
    let s = aq
        .add_sensor("Sump", Box::new(DigitalInput::new(float.clone())), &mut sink)
        .unwrap();
    let (pump, pump_pin) = relay_on_pin(&mut aq, "ATO pump", &mut sink);

    let mut rule = LevelController::new();
    rule.assign_sensor(s);
    let c = aq.add_controller("Top-off", Box::new(rule), &mut sink).unwrap();
    aq.assign_actuator(pump, c).unwrap();

    let mut at = |ms: u64, low_water: bool| {
        float.high.set(low_water);
        aq.run_cycle(ms, None);
        pump_pin.high.get()
    };

    assert!(!at(0, false));
    assert!(!at(1_000, true)); // debounce starts
    assert!(!at(3_000, true)); // 2 s, not yet
    assert!(at(4_500, true)); // > 3 s: refill
    assert!(at(6_000, false)); // overrun starts
    assert!(at(15_000, false)); // 9 s
    assert!(!at(16_500, false)); // > 10 s: done
}

#[test]
fn refill_timeout_latches_until_reset() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let probe = ScriptedSensor::reading(1.0);
    let s = aq.add_sensor("Sump", Box::new(probe), &mut sink).unwrap();
    let relay = MockRelay::default();
    let pump = aq.add_actuator("Pump", Box::new(relay.clone()), &mut sink).unwrap();

    let mut rule = LevelController::new();
    rule.assign_sensor(s);
    let c = aq.add_controller("Top-off", Box::new(rule), &mut sink).unwrap();
    aq.assign_actuator(pump, c).unwrap();

    aq.run_cycle(0, None);
    aq.run_cycle(3_500, None);
    assert!(relay.on.get());
    aq.run_cycle(40_000, None);
    assert!(!relay.on.get());

    let report = aq.run_cycle(41_000, None);
    assert_eq!(report.controllers_latched, 1);
    assert!(!relay.on.get());

    aq.controller_mut(c).unwrap().rule_mut().reset();
    let report = aq.run_cycle(42_000, None);
    assert_eq!(report.controllers_run, 1);
}

// ── Clock timer ───────────────────────────────────────────────

#[test]
fn light_follows_clock_window() {
    let mut aq = Aquarium::new();
    let mut sink = RecordingSink::new();
    let relay = MockRelay::default();
    let light = aq.add_actuator("Light", Box::new(relay.clone()), &mut sink).unwrap();

    let mut rule = ClockTimerController::new();
    let timer = rule.timer_mut(0).unwrap();
    timer.set_actuator(light);
    assert!(timer.set_window(0, TimeWindow::new(22, 0, 6, 30).unwrap()));
    let c = aq.add_controller("Moonlight", Box::new(rule), &mut sink).unwrap();
    aq.assign_actuator(light, c).unwrap();

    let tod = |hour, minute| {
        Some(aquanode::app::ports::TimeOfDay {
            hour,
            minute,
            weekday: 4,
        })
    };

    // No wall clock yet.
    let report = aq.run_cycle(0, None);
    assert_eq!(report.controllers_skipped, 1);

    aq.run_cycle(0, tod(12, 0));
    assert!(!relay.on.get());
    aq.run_cycle(0, tod(22, 0));
    assert!(relay.on.get());
    aq.run_cycle(0, tod(3, 15));
    assert!(relay.on.get());
    aq.run_cycle(0, tod(6, 30));
    assert!(!relay.on.get());

    // Only the two edges reached the driver.
    assert_eq!(*relay.commands.borrow(), vec![true, false]);
}
