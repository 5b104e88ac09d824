//! Dimmable output (LED light bar, DC pump) on an embedded-hal PWM channel.
//!
//! The configured duty cycle is remembered across on/off switching: `on`
//! applies it, `off` drives 0 %.  The duty cycle is persisted.

use embedded_hal::pwm::SetDutyCycle;
use serde::{Deserialize, Serialize};

use super::{Actuator, ActuatorKind};
use crate::error::{ActuatorError, CodecError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct PwmParams {
    duty: f32,
}

pub struct PwmOutput<P> {
    channel: P,
    duty: f32,
    on: bool,
}

impl<P: SetDutyCycle> PwmOutput<P> {
    /// Full brightness when on.  The channel is driven to 0 % immediately.
    pub fn new(channel: P) -> Result<Self, ActuatorError> {
        let mut out = Self {
            channel,
            duty: 1.0,
            on: true,
        };
        out.off()?;
        Ok(out)
    }

    /// Configured duty cycle in `0.0..=1.0`.
    pub fn duty(&self) -> f32 {
        self.duty
    }

    fn apply(&mut self, duty: f32) -> Result<(), ActuatorError> {
        let max = self.channel.max_duty_cycle();
        let raw = (duty * f32::from(max)).round() as u16;
        self.channel
            .set_duty_cycle(raw.min(max))
            .map_err(|_| ActuatorError::PwmWriteFailed)
    }
}

impl<P: SetDutyCycle> Actuator for PwmOutput<P> {
    fn kind(&self) -> ActuatorKind {
        ActuatorKind::PwmOutput
    }

    fn on(&mut self) -> Result<(), ActuatorError> {
        self.apply(self.duty)?;
        self.on = true;
        Ok(())
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        self.apply(0.0)?;
        self.on = false;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }

    fn supports_pwm(&self) -> bool {
        true
    }

    /// Out-of-range values are clamped.  Takes effect immediately when on.
    fn set_pwm(&mut self, duty: f32) -> Result<(), ActuatorError> {
        let duty = if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 1.0) };
        if self.on {
            self.apply(duty)?;
        }
        self.duty = duty;
        Ok(())
    }

    fn pwm(&self) -> f32 {
        if self.on { self.duty } else { 0.0 }
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        Ok(postcard::to_slice(&PwmParams { duty: self.duty }, buf)?.len())
    }

    fn deserialize(&mut self, buf: &[u8]) -> Result<usize, CodecError> {
        let (params, rest) = postcard::take_from_bytes::<PwmParams>(buf)?;
        if !(0.0..=1.0).contains(&params.duty) {
            return Err(CodecError::Invalid);
        }
        self.duty = params.duty;
        Ok(buf.len() - rest.len())
    }
}
