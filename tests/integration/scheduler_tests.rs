//! Integration tests for the run loop: trigger modes and telemetry
//! flushing.

use aquanode::app::events::AppEvent;
use aquanode::app::service::Aquarium;
use aquanode::config::{SchedulingMode, SystemConfig};
use aquanode::controllers::temperature::TemperatureController;
use aquanode::drivers::hw_timer::TickSignal;
use aquanode::registry::SlotId;
use aquanode::scheduler::{PollingTrigger, Scheduler, TimerTrigger, Trigger};

use crate::mock_hw::{FixedClock, MockRelay, RecordingSink, RecordingUplink, ScriptedSensor};

struct Tank {
    aq: Aquarium,
    probe: ScriptedSensor,
    heater: MockRelay,
    chiller: MockRelay,
}

fn tank() -> Tank {
    let mut sink = RecordingSink::new();
    let mut aq = Aquarium::new();
    let probe = ScriptedSensor::reading(25.0);
    let heater = MockRelay::default();
    let chiller = MockRelay::default();
    let s = aq.add_sensor("Water", Box::new(probe.clone()), &mut sink).unwrap();
    let h = aq.add_actuator("Heater", Box::new(heater.clone()), &mut sink).unwrap();
    let k = aq.add_actuator("Chiller", Box::new(chiller.clone()), &mut sink).unwrap();
    let mut rule = TemperatureController::new();
    rule.assign_sensor(s);
    rule.assign_heating_actuator(h);
    rule.assign_cooling_actuator(k);
    let c = aq.add_controller("Thermostat", Box::new(rule), &mut sink).unwrap();
    aq.assign_actuator(h, c).unwrap();
    aq.assign_actuator(k, c).unwrap();
    Tank {
        aq,
        probe,
        heater,
        chiller,
    }
}

const PROFILE: [f64; 10] = [25.0, 23.9, 24.2, 24.6, 26.4, 25.8, 25.4, 19.0, 30.0, 25.0];

#[test]
fn timer_and_polling_modes_make_identical_decisions() {
    static TICK: TickSignal = TickSignal::new();

    let mut polled = tank();
    let mut timed = tank();
    let cfg = SystemConfig::default();
    let mut poll_sched = Scheduler::new(PollingTrigger, &cfg);
    let mut timer_sched = Scheduler::new(TimerTrigger::new(&TICK), &cfg);

    let clock = FixedClock::at(0);
    let mut uplink = RecordingUplink::default();
    let mut poll_events = RecordingSink::new();
    let mut timer_events = RecordingSink::new();

    for &t in &PROFILE {
        clock.advance(1000);
        polled.probe.set(t);
        timed.probe.set(t);

        poll_sched.step(&mut polled.aq, &clock, &mut uplink, &mut poll_events);

        // Nothing runs between ticks; one tick runs exactly one cycle.
        assert!(timer_sched
            .step(&mut timed.aq, &clock, &mut uplink, &mut timer_events)
            .is_none());
        TICK.signal(());
        assert!(timer_sched
            .step(&mut timed.aq, &clock, &mut uplink, &mut timer_events)
            .is_some());

        assert_eq!(polled.heater.on.get(), timed.heater.on.get());
        assert_eq!(polled.chiller.on.get(), timed.chiller.on.get());
        assert!(!(timed.heater.on.get() && timed.chiller.on.get()));
    }

    assert_eq!(*polled.heater.commands.borrow(), *timed.heater.commands.borrow());
    assert_eq!(*polled.chiller.commands.borrow(), *timed.chiller.commands.borrow());
    assert_eq!(poll_events.events, timer_events.events);
    assert_eq!(polled.aq.cycle_count(), timed.aq.cycle_count());
}

#[test]
fn switches_are_reported_as_events() {
    let mut t = tank();
    let cfg = SystemConfig::default();
    let mut sched = Scheduler::new(PollingTrigger, &cfg);
    let clock = FixedClock::at(0);
    let mut events = RecordingSink::new();

    t.probe.set(20.0);
    sched.step(&mut t.aq, &clock, &mut RecordingUplink::default(), &mut events);
    assert_eq!(
        events.events,
        vec![AppEvent::ActuatorSwitched {
            actuator: SlotId::new(0),
            controller: SlotId::new(0),
            on: true,
        }]
    );

    t.probe.fail();
    events.events.clear();
    sched.step(&mut t.aq, &clock, &mut RecordingUplink::default(), &mut events);
    assert!(matches!(
        events.events.as_slice(),
        [AppEvent::SensorReadFailed { sensor, .. }] if *sensor == SlotId::new(0)
    ));
}

#[test]
fn start_announces_mode_and_population() {
    static TICK: TickSignal = TickSignal::new();
    let t = tank();
    let cfg = SystemConfig::default();
    let sched = Scheduler::new(Trigger::from_config(&cfg, &TICK), &cfg);
    let mut events = RecordingSink::new();
    sched.start(&t.aq, &mut events);
    assert_eq!(
        events.events,
        vec![AppEvent::Started {
            mode: SchedulingMode::Timer,
            controllers: 1,
            actuators: 2,
            sensors: 1,
        }]
    );
}

// ── Telemetry ─────────────────────────────────────────────────

fn telemetry_config() -> SystemConfig {
    SystemConfig {
        scheduling_mode: SchedulingMode::Polling,
        control_interval_ms: 1000,
        telemetry_enabled: true,
        telemetry_interval_secs: 5,
    }
}

#[test]
fn telemetry_flushes_once_per_interval() {
    let mut t = tank();
    let cfg = telemetry_config();
    let mut sched = Scheduler::new(PollingTrigger, &cfg);
    let clock = FixedClock::at(0);
    let mut uplink = RecordingUplink::default();
    let mut events = RecordingSink::new();

    // 1 s cycles for 12 s.
    for _ in 0..12 {
        clock.advance(1000);
        sched.step(&mut t.aq, &clock, &mut uplink, &mut events);
    }

    // Flushes at 5 s and 10 s, each carrying every sample since the last.
    assert_eq!(uplink.batches.len(), 2);
    assert_eq!(uplink.batches[0].len(), 5);
    assert_eq!(uplink.batches[1].len(), 5);
    assert_eq!(uplink.batches[1][0].uptime_ms, 6000);
    assert_eq!(t.aq.pending_telemetry(), 2);
    assert_eq!(
        events.count(|e| matches!(e, AppEvent::TelemetryFlushed { samples: 5 })),
        2
    );
}

#[test]
fn offline_uplink_keeps_samples() {
    let mut t = tank();
    let cfg = telemetry_config();
    let mut sched = Scheduler::new(PollingTrigger, &cfg);
    let clock = FixedClock::at(0);
    let mut uplink = RecordingUplink {
        offline: true,
        ..RecordingUplink::default()
    };
    let mut events = RecordingSink::new();

    for _ in 0..5 {
        clock.advance(1000);
        sched.step(&mut t.aq, &clock, &mut uplink, &mut events);
    }
    assert_eq!(t.aq.pending_telemetry(), 5);
    assert_eq!(
        events.count(|e| matches!(e, AppEvent::TelemetryFailed(_))),
        1
    );

    // Back online: the backlog goes out with the next flush.
    uplink.offline = false;
    for _ in 0..5 {
        clock.advance(1000);
        sched.step(&mut t.aq, &clock, &mut uplink, &mut events);
    }
    assert_eq!(uplink.batches.len(), 1);
    assert_eq!(uplink.batches[0].len(), 10);
    assert_eq!(t.aq.pending_telemetry(), 0);
}

#[test]
fn telemetry_disabled_never_publishes() {
    let mut t = tank();
    let cfg = SystemConfig {
        telemetry_enabled: false,
        ..telemetry_config()
    };
    let mut sched = Scheduler::new(PollingTrigger, &cfg);
    let clock = FixedClock::at(0);
    let mut uplink = RecordingUplink::default();
    for _ in 0..20 {
        clock.advance(1000);
        sched.step(&mut t.aq, &clock, &mut uplink, &mut RecordingSink::new());
    }
    assert!(uplink.batches.is_empty());
    assert_eq!(
        t.aq.pending_telemetry(),
        20,
        "samples accumulate for a later uplink"
    );
}
