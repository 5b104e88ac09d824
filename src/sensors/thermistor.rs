//! NTC thermistor temperature probe (10 kOhm @ 25 C, B = 3950).
//!
//! Wired in a voltage divider with a fixed 10 kOhm resistor and sampled
//! by a 12-bit ADC.  The simplified Beta equation converts resistance to
//! temperature.  A per-probe offset calibrates out divider tolerance and
//! is the only persisted parameter.

use serde::{Deserialize, Serialize};

use super::{Sensor, SensorKind};
use crate::error::{CodecError, SensorError};

const R25: f64 = 10_000.0;
const BETA: f64 = 3950.0;
const T25_K: f64 = 298.15;
const R_DIVIDER: f64 = 10_000.0;
const ADC_MAX: f64 = 4095.0;
const V_REF: f64 = 3.3;

/// One raw ADC conversion.
///
/// Implemented for closures so board code can wrap whatever oneshot
/// driver the HAL provides.
pub trait AdcSource {
    fn sample(&mut self) -> Result<u16, SensorError>;
}

impl<F> AdcSource for F
where
    F: FnMut() -> Result<u16, SensorError>,
{
    fn sample(&mut self) -> Result<u16, SensorError> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Calibration {
    offset_c: f64,
}

pub struct Thermistor<A> {
    adc: A,
    offset_c: f64,
}

impl<A: AdcSource> Thermistor<A> {
    pub fn new(adc: A) -> Self {
        Self { adc, offset_c: 0.0 }
    }

    pub fn offset_c(&self) -> f64 {
        self.offset_c
    }

    pub fn set_offset_c(&mut self, offset_c: f64) {
        self.offset_c = offset_c;
    }
}

/// Convert a raw divider sample to degrees Celsius.  Samples pinned to
/// either rail mean an open or shorted probe.
pub fn adc_to_celsius(raw: u16) -> Result<f64, SensorError> {
    let voltage = (f64::from(raw) / ADC_MAX) * V_REF;
    if voltage <= 0.01 || voltage >= (V_REF - 0.01) {
        return Err(SensorError::OutOfRange);
    }
    let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return Err(SensorError::OutOfRange);
    }
    Ok((1.0 / inv_t) - 273.15)
}

impl<A: AdcSource> Sensor for Thermistor<A> {
    fn kind(&self) -> SensorKind {
        SensorKind::Thermistor
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        let raw = self.adc.sample()?;
        Ok(adc_to_celsius(raw)? + self.offset_c)
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let cal = Calibration {
            offset_c: self.offset_c,
        };
        Ok(postcard::to_slice(&cal, buf)?.len())
    }

    fn deserialize(&mut self, buf: &[u8]) -> Result<usize, CodecError> {
        let (cal, rest) = postcard::take_from_bytes::<Calibration>(buf)?;
        if !cal.offset_c.is_finite() {
            return Err(CodecError::Invalid);
        }
        self.offset_c = cal.offset_c;
        Ok(buf.len() - rest.len())
    }
}
