//! Two-state input (float switch, door contact) on an embedded-hal pin.
//!
//! Reads `1.0` when the pin is at its active level and `0.0` otherwise.
//! The level controller treats any positive reading as "level reached".

use embedded_hal::digital::InputPin;
use serde::{Deserialize, Serialize};

use super::{Sensor, SensorKind};
use crate::error::{CodecError, SensorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct InputParams {
    active_low: bool,
}

pub struct DigitalInput<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> DigitalInput<P> {
    /// Active-high input.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// Input that is asserted when the pin reads low (pull-up wiring).
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    pub fn is_active_low(&self) -> bool {
        self.active_low
    }
}

impl<P: InputPin> Sensor for DigitalInput<P> {
    fn kind(&self) -> SensorKind {
        SensorKind::DigitalInput
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        let high = self.pin.is_high().map_err(|_| SensorError::GpioReadFailed)?;
        Ok(if high != self.active_low { 1.0 } else { 0.0 })
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let params = InputParams {
            active_low: self.active_low,
        };
        Ok(postcard::to_slice(&params, buf)?.len())
    }

    fn deserialize(&mut self, buf: &[u8]) -> Result<usize, CodecError> {
        let (params, rest) = postcard::take_from_bytes::<InputParams>(buf)?;
        self.active_low = params.active_low;
        Ok(buf.len() - rest.len())
    }
}
