//! aquanode firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter      LogEventSink            SystemClock           │
//! │  (StoragePort)   (EventSink+Telemetry)   (ClockPort)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Aquarium (pure logic)                     │    │
//! │  │  controllers · actuators · sensors · readings          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (polling or esp_timer tick)                         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::fmt::Write as _;

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use aquanode::actuators::digital_output::DigitalOutput;
use aquanode::actuators::pwm_output::PwmOutput;
use aquanode::adapters::log_sink::LogEventSink;
use aquanode::adapters::nvs::NvsAdapter;
use aquanode::adapters::time::SystemClock;
use aquanode::app::ports::ConfigPort;
use aquanode::app::service::Aquarium;
use aquanode::config::{SchedulingMode, SystemConfig};
use aquanode::controllers::clock_timer::{ClockTimerController, TimeWindow};
use aquanode::controllers::level::LevelController;
use aquanode::controllers::temperature::TemperatureController;
use aquanode::drivers::adc::{self, Adc1Channel, THERMISTOR_CHANNEL};
use aquanode::drivers::hw_timer::{self, CONTROL_TICK};
use aquanode::naming::Name;
use aquanode::persistence::ConfigStore;
use aquanode::pins;
use aquanode::registry::SlotId;
use aquanode::scheduler::{PollingTrigger, Scheduler, Trigger};
use aquanode::sensors::digital_input::DigitalInput;
use aquanode::sensors::thermistor::Thermistor;

/// Main-loop sleep between timer-tick polls.
const TICK_POLL_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  aquanode v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;

    // ── 2. Storage + system config ────────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {}", e))?;
    let mut store = ConfigStore::new(nvs);
    let config = match store.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };
    info!("Config: {:?}", config);

    let mut events = LogEventSink::new();
    let mut aquarium = Aquarium::new();

    // ── 3. Actuators ──────────────────────────────────────────
    let mut outlets: heapless::Vec<SlotId, { pins::OUTLET_COUNT }> = heapless::Vec::new();
    for (i, &gpio) in pins::OUTLET_GPIOS.iter().enumerate() {
        // SAFETY: every GPIO number in `pins` is claimed exactly once.
        let pin = PinDriver::output(unsafe { AnyOutputPin::new(gpio) })?;
        let device = DigitalOutput::new(pin).map_err(|e| anyhow!("outlet {}: {}", i + 1, e))?;
        let mut name = Name::new();
        let _ = write!(name, "Outlet {}", i + 1);
        if let Some(id) = aquarium.add_actuator(&name, Box::new(device), &mut events) {
            let _ = outlets.push(id);
        }
    }

    let light_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(Hertz(pins::LIGHT_PWM_FREQ_HZ))
            .resolution(Resolution::Bits8),
    )?;
    // SAFETY: see above.
    let light_pin = unsafe { AnyOutputPin::new(pins::LIGHT_PWM_GPIO) };
    let light_channel = LedcDriver::new(peripherals.ledc.channel0, light_timer, light_pin)?;
    let light = PwmOutput::new(light_channel).map_err(|e| anyhow!("light: {}", e))?;
    let light = aquarium.add_actuator("Light", Box::new(light), &mut events);

    // ── 4. Sensors ────────────────────────────────────────────
    if let Err(e) = adc::init_adc1(&[THERMISTOR_CHANNEL]) {
        warn!("{}; temperature readings unavailable", e);
    }
    let thermistor = Thermistor::new(Adc1Channel(THERMISTOR_CHANNEL));
    let temperature = aquarium.add_sensor("Water temp", Box::new(thermistor), &mut events);

    // SAFETY: see above.
    let mut level_pin = PinDriver::input(unsafe { AnyInputPin::new(pins::LEVEL_SWITCH_GPIO) })?;
    level_pin.set_pull(Pull::Up)?;
    let level = aquarium.add_sensor(
        "Sump level",
        Box::new(DigitalInput::active_low(level_pin)),
        &mut events,
    );

    // ── 5. Controllers (factory defaults; stored records win) ─
    let outlet = |n: usize| outlets.get(n).copied().unwrap_or(SlotId::UNASSIGNED);

    let mut heating = TemperatureController::new();
    heating.assign_sensor(temperature.unwrap_or(SlotId::UNASSIGNED));
    heating.assign_heating_actuator(outlet(0));
    heating.assign_cooling_actuator(outlet(1));
    if let Some(c) = aquarium.add_controller("Temperature", Box::new(heating), &mut events) {
        for a in [outlet(0), outlet(1)] {
            assign(&mut aquarium, a, c);
        }
    }

    let mut refill = LevelController::new();
    refill.assign_sensor(level.unwrap_or(SlotId::UNASSIGNED));
    if let Some(c) = aquarium.add_controller("Refill", Box::new(refill), &mut events) {
        assign(&mut aquarium, outlet(2), c);
    }

    let mut lighting = ClockTimerController::new();
    if let (Some(timer), Some(light)) = (lighting.timer_mut(0), light) {
        timer.set_actuator(light);
        if let Some(window) = TimeWindow::new(10, 0, 21, 0) {
            let _ = timer.set_window(0, window);
        }
    }
    if let Some(c) = aquarium.add_controller("Light timer", Box::new(lighting), &mut events) {
        if let Some(light) = light {
            assign(&mut aquarium, light, c);
        }
    }

    // ── 6. Restore stored configuration ───────────────────────
    let restored = aquarium.restore_all(&store, &mut events);
    if restored.not_found > 0 {
        // First boot for some slots: persist the factory defaults.
        aquarium.save_all(&mut store, &mut events);
    }
    match aquarium.status_json() {
        Ok(json) => info!("STATUS | {}", json),
        Err(e) => warn!("STATUS | render failed: {}", e),
    }

    // ── 7. Scheduler ──────────────────────────────────────────
    let mut trigger = Trigger::from_config(&config, &CONTROL_TICK);
    if config.scheduling_mode == SchedulingMode::Timer
        && !hw_timer::start_control_timer(config.control_interval_ms)
    {
        warn!("Control timer unavailable, falling back to polling");
        trigger = Trigger::Polling(PollingTrigger);
    }
    let mut scheduler = Scheduler::new(trigger, &config);
    let clock = SystemClock::new();
    let mut uplink = LogEventSink::new();
    scheduler.start(&aquarium, &mut events);

    info!("System ready. Entering run loop.");

    // ── 8. Run loop ───────────────────────────────────────────
    let idle_ms = match scheduler.mode() {
        SchedulingMode::Polling => config.control_interval_ms,
        SchedulingMode::Timer => TICK_POLL_MS,
    };
    loop {
        scheduler.step(&mut aquarium, &clock, &mut uplink, &mut events);
        FreeRtos::delay_ms(idle_ms);
    }
}

fn assign(aquarium: &mut Aquarium, actuator: SlotId, controller: SlotId) {
    if let Err(e) = aquarium.assign_actuator(actuator, controller) {
        warn!("Assigning A{} to C{} failed: {}", actuator, controller, e);
    }
}
