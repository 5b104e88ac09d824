//! Relay or power-outlet channel on an embedded-hal output pin.

use embedded_hal::digital::OutputPin;

use super::{Actuator, ActuatorKind};
use crate::error::ActuatorError;

pub struct DigitalOutput<P> {
    pin: P,
    active_low: bool,
    on: bool,
}

impl<P: OutputPin> DigitalOutput<P> {
    /// Output that energises the load when the pin is driven high.
    /// The pin is driven to the off level immediately.
    pub fn new(pin: P) -> Result<Self, ActuatorError> {
        Self::with_polarity(pin, false)
    }

    /// Output for relay boards that switch on a low level.
    pub fn active_low(pin: P) -> Result<Self, ActuatorError> {
        Self::with_polarity(pin, true)
    }

    fn with_polarity(pin: P, active_low: bool) -> Result<Self, ActuatorError> {
        let mut out = Self {
            pin,
            active_low,
            on: true,
        };
        out.off()?;
        Ok(out)
    }

    fn drive(&mut self, on: bool) -> Result<(), ActuatorError> {
        let high = on != self.active_low;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }
}

impl<P: OutputPin> Actuator for DigitalOutput<P> {
    fn kind(&self) -> ActuatorKind {
        ActuatorKind::DigitalOutput
    }

    fn on(&mut self) -> Result<(), ActuatorError> {
        self.drive(true)
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        self.drive(false)
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
