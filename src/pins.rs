//! GPIO / peripheral pin assignments for the aquanode main board
//! (ESP32-S3).
//!
//! Single source of truth: `main.rs` builds every driver from these
//! constants rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Power outlets (relay board, active HIGH)
// ---------------------------------------------------------------------------

pub const OUTLET_COUNT: usize = 8;

/// Relay-switched mains outlets, in actuator registration order.
pub const OUTLET_GPIOS: [i32; OUTLET_COUNT] = [4, 5, 6, 7, 15, 16, 17, 18];

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Float switch in the sump.  Pulled up; the switch closes to GND when
/// the water level drops, so the input is active LOW.
pub const LEVEL_SWITCH_GPIO: i32 = 8;

// NTC thermistor divider: GPIO 9, ADC1 channel 8 (see `drivers::adc`).

// ---------------------------------------------------------------------------
// PWM light (LED driver dimming input)
// ---------------------------------------------------------------------------

pub const LIGHT_PWM_GPIO: i32 = 10;

/// LEDC base frequency for the LED driver.
pub const LIGHT_PWM_FREQ_HZ: u32 = 1_000;
